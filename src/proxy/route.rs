//! Route decisions
//!
//! Every request path maps to exactly one of two origins. The decision is a
//! pure function of the path (and, for `/ws`, the `Upgrade` header), so the
//! table is built once and shared read-only by every connection.

use hyper::HeaderMap;
use url::Url;

use crate::config::RoutingConfig;
use crate::error::ProxyError;
use crate::http::headers;

/// Path that gets WebSocket-aware forwarding when an upgrade is requested
pub const WEBSOCKET_PATH: &str = "/ws";

/// Which origin a request goes to, and how its response is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// API/dynamic traffic. `websocket` is set for an upgrade on `/ws`.
    Backend { websocket: bool },
    /// Everything else: the static single-page app
    Frontend,
}

impl RouteOutcome {
    pub fn is_backend(&self) -> bool {
        matches!(self, RouteOutcome::Backend { .. })
    }

    pub fn is_websocket(&self) -> bool {
        matches!(self, RouteOutcome::Backend { websocket: true })
    }

    /// Only the plain backend hop explicitly follows upstream redirects.
    pub fn follows_redirects(&self) -> bool {
        matches!(self, RouteOutcome::Backend { websocket: false })
    }

    /// Response header mutation for this route.
    ///
    /// The plain backend hop gets `Access-Control-Allow-Origin: *`. WebSocket
    /// handshakes and frontend responses are left untouched.
    pub fn apply_response_policy(&self, headers: &mut HeaderMap) {
        if let RouteOutcome::Backend { websocket: false } = self {
            headers::force_allow_any_origin(headers);
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RouteOutcome::Backend { websocket: true } => "backend-ws",
            RouteOutcome::Backend { websocket: false } => "backend",
            RouteOutcome::Frontend => "frontend",
        }
    }
}

/// The two origins plus the ordered backend prefix list.
#[derive(Debug, Clone)]
pub struct RouteTable {
    backend_origin: String,
    frontend_origin: String,
    backend_paths: Vec<String>,
}

impl RouteTable {
    /// Validate and normalise routing configuration.
    ///
    /// Origins are reduced to `scheme://host[:port]`.
    pub fn new(
        backend_origin: &str,
        frontend_origin: &str,
        backend_paths: Vec<String>,
    ) -> Result<Self, ProxyError> {
        for prefix in &backend_paths {
            if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
                return Err(ProxyError::InvalidPrefix(prefix.clone()));
            }
        }

        Ok(Self {
            backend_origin: normalise_origin(backend_origin)?,
            frontend_origin: normalise_origin(frontend_origin)?,
            backend_paths,
        })
    }

    pub fn from_config(config: &RoutingConfig) -> Result<Self, ProxyError> {
        Self::new(
            &config.backend_origin,
            &config.frontend_origin,
            config.backend_paths.clone(),
        )
    }

    pub fn backend_origin(&self) -> &str {
        &self.backend_origin
    }

    pub fn frontend_origin(&self) -> &str {
        &self.frontend_origin
    }

    pub fn backend_paths(&self) -> &[String] {
        &self.backend_paths
    }

    /// Exact match on a prefix, or the prefix followed by `/`.
    ///
    /// `/apiextra` does not match `/api`.
    pub fn is_backend_path(&self, path: &str) -> bool {
        self.backend_paths.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Decide the route for a request.
    ///
    /// Upgrade handling is tied to the exact `/ws` path. An upgrade on a
    /// sub-path like `/ws/room1` is forwarded as plain backend HTTP.
    pub fn classify(&self, path: &str, headers: &HeaderMap) -> RouteOutcome {
        if !self.is_backend_path(path) {
            return RouteOutcome::Frontend;
        }
        let websocket = path == WEBSOCKET_PATH && headers::is_websocket_upgrade(headers);
        RouteOutcome::Backend { websocket }
    }

    pub fn origin_for(&self, outcome: RouteOutcome) -> &str {
        if outcome.is_backend() {
            &self.backend_origin
        } else {
            &self.frontend_origin
        }
    }

    /// Route a request and build its upstream URL.
    ///
    /// The path is normalised first, so the prefix test, the `/ws` check and
    /// the forwarded path all see the same value.
    pub fn resolve(
        &self,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<(RouteOutcome, Url), ProxyError> {
        let path = self.normalise_path(path)?;
        let outcome = self.classify(&path, headers);
        let target = self.target_url(outcome, &path, query)?;
        Ok((outcome, target))
    }

    /// Resolve `.`/`..` segments (plain or percent-encoded) the way a URL
    /// parser does. `/api/../admin` becomes `/admin`.
    pub fn normalise_path(&self, path: &str) -> Result<String, ProxyError> {
        let base = self.join_origin(&self.frontend_origin, path)?;
        Ok(base.path().to_owned())
    }

    /// Upstream URL: origin, then the path, then the query if any.
    ///
    /// Only origin-form paths (starting with `/`) are accepted; anything
    /// else, such as the `*` of `OPTIONS *`, could alter the host.
    pub fn target_url(
        &self,
        outcome: RouteOutcome,
        path: &str,
        query: Option<&str>,
    ) -> Result<Url, ProxyError> {
        let mut url = self.join_origin(self.origin_for(outcome), path)?;
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }

    fn join_origin(&self, origin: &str, path: &str) -> Result<Url, ProxyError> {
        let target = format!("{origin}{path}");
        if !path.starts_with('/') {
            return Err(ProxyError::InvalidTarget {
                target,
                source: None,
            });
        }
        Url::parse(&target).map_err(|source| ProxyError::InvalidTarget {
            target,
            source: Some(source),
        })
    }
}

fn normalise_origin(raw: &str) -> Result<String, ProxyError> {
    let invalid = |reason: &str| ProxyError::InvalidOrigin {
        origin: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a path, query or fragment"));
    }

    Ok(url.origin().ascii_serialization())
}
