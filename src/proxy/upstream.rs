//! Upstream request forwarding
//!
//! This module turns one inbound request into exactly one outbound request
//! and relays the answer. There are no retries and no timeouts here; a
//! failed fetch surfaces to the caller, who owns any retry policy.

use std::time::Instant;

use http_body_util::BodyExt;
use hyper::body::{Body, Incoming};
use hyper::{Request, Response, StatusCode};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::http::headers;
use crate::http::response;
use crate::http::ProxyBody;
use crate::proxy::route::{RouteOutcome, RouteTable};
use crate::proxy::tunnel;

/// Forwards requests to the backend or frontend origin
///
/// Origins are contacted directly; `HTTP_PROXY`-style environment settings
/// are ignored.
pub struct ProxyHandler {
    routes: RouteTable,

    /// Plain backend hop, follows redirects
    backend_client: reqwest::Client,

    /// Frontend hop, client defaults
    frontend_client: reqwest::Client,

    /// WebSocket handshakes: HTTP/1.1, no redirects, no idle pool
    upgrade_client: reqwest::Client,
}

impl ProxyHandler {
    pub fn new(routes: RouteTable, config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let backend_client = reqwest::Client::builder()
            .no_proxy()
            .redirect(Policy::limited(config.max_redirects))
            .build()
            .map_err(ProxyError::Client)?;

        let frontend_client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(ProxyError::Client)?;

        let upgrade_client = reqwest::Client::builder()
            .no_proxy()
            .http1_only()
            .redirect(Policy::none())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(ProxyError::Client)?;

        Ok(Self {
            routes,
            backend_client,
            frontend_client,
            upgrade_client,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Serve one inbound request.
    ///
    /// Never fails toward hyper: a failed invocation becomes a status-only
    /// response (500 for a bad target, 502 for an unreachable origin).
    pub async fn handle(&self, request: Request<Incoming>) -> Response<ProxyBody> {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        match self.forward_request(request).await {
            Ok((outcome, response)) => {
                tracing::info!(
                    method = %method,
                    path = %path,
                    route = outcome.label(),
                    status = response.status().as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request forwarded"
                );
                response
            }
            Err(e) => {
                let status = e.status();
                tracing::error!(
                    method = %method,
                    path = %path,
                    status = status.as_u16(),
                    error = %e,
                    cause = ?std::error::Error::source(&e),
                    "Failed to forward request"
                );
                response::status_only(status)
            }
        }
    }

    /// Route and forward a request, returning the decision with the response.
    pub async fn forward_request(
        &self,
        request: Request<Incoming>,
    ) -> Result<(RouteOutcome, Response<ProxyBody>), ProxyError> {
        let uri = request.uri();
        let (outcome, target) = self
            .routes
            .resolve(uri.path(), uri.query(), request.headers())?;

        tracing::debug!(
            route = outcome.label(),
            url = %target,
            "Forwarding request"
        );

        let response = if outcome.is_websocket() {
            self.forward_upgrade(request, target).await?
        } else {
            self.forward_http(outcome, request, target).await?
        };
        Ok((outcome, response))
    }

    /// Plain HTTP hop: method, headers and body stream through unchanged.
    async fn forward_http(
        &self,
        outcome: RouteOutcome,
        request: Request<Incoming>,
        target: Url,
    ) -> Result<Response<ProxyBody>, ProxyError> {
        let client = if outcome.follows_redirects() {
            &self.backend_client
        } else {
            &self.frontend_client
        };

        let (parts, body) = request.into_parts();
        let mut outbound = client
            .request(parts.method, target.clone())
            .headers(headers::forwardable_request(&parts.headers));

        // An already-finished body goes out as no body, otherwise a GET
        // would turn into a chunked request.
        if !body.is_end_stream() {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = outbound.send().await.map_err(|source| ProxyError::Upstream {
            target: target.to_string(),
            source,
        })?;

        let mut response = response::from_upstream(upstream);
        outcome.apply_response_policy(response.headers_mut());
        Ok(response)
    }

    /// WebSocket handshake on `/ws`.
    ///
    /// A `101` answer is returned with upstream's headers verbatim and the
    /// two connections are spliced once both sides have switched. Any other
    /// answer is relayed as-is.
    async fn forward_upgrade(
        &self,
        mut request: Request<Incoming>,
        target: Url,
    ) -> Result<Response<ProxyBody>, ProxyError> {
        let client_upgrade = hyper::upgrade::on(&mut request);
        let (parts, _body) = request.into_parts();

        let upstream = self
            .upgrade_client
            .request(parts.method, target.clone())
            .headers(headers::forwardable_upgrade(&parts.headers))
            .send()
            .await
            .map_err(|source| ProxyError::Upstream {
                target: target.to_string(),
                source,
            })?;

        if upstream.status() != StatusCode::SWITCHING_PROTOCOLS {
            tracing::debug!(
                url = %target,
                status = upstream.status().as_u16(),
                "Upstream declined WebSocket upgrade"
            );
            let status = upstream.status();
            let headers = upstream.headers().clone();
            let mut response = Response::new(response::stream_body(upstream));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            return Ok(response);
        }

        let mut response = Response::new(response::empty());
        *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
        *response.headers_mut() = upstream.headers().clone();

        tokio::spawn(tunnel::splice(client_upgrade, upstream, target));
        Ok(response)
    }
}
