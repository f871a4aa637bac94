//! Shared fixtures: in-process origins and a running router.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use edge_router::config::UpstreamConfig;
use edge_router::proxy::{ProxyHandler, RouteTable};
use edge_router::server;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, CONNECTION, CONTENT_TYPE, HOST, LOCATION, UPGRADE,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// What every mock origin sets, so tests can see it get overridden
pub const ORIGIN_ALLOW: &str = "https://origin.example";

pub const DEFAULT_PATHS: [&str; 5] = ["/api", "/uploads", "/ws", "/static", "/files"];

/// Start a mock origin that reports what it received.
///
/// Response headers: `x-origin` (the given name), `x-seen-method`,
/// `x-seen-uri`, `x-seen-host`, `x-seen-upgrade`. The body is echoed.
/// Special paths:
/// - `*/redirect` answers 302 to `/api/landing`
/// - `*/fail` answers 503 with body `origin down`
/// - an upgrade request whose query contains `decline` answers 403
/// - any other request with `Upgrade: websocket` is switched and echoed raw
pub async fn spawn_origin(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let service = service_fn(move |req| origin(name, req));
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .with_upgrades()
                    .await;
            });
        }
    });

    addr
}

async fn origin(
    name: &'static str,
    mut req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_owned();
    let wants_upgrade = req
        .headers()
        .get(UPGRADE)
        .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"websocket"));

    if wants_upgrade && req.uri().query().is_some_and(|q| q.contains("decline")) {
        let response = Response::builder()
            .status(StatusCode::FORBIDDEN)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN_ALLOW)
            .header("x-origin", name)
            .body(Full::new(Bytes::from_static(b"upgrade refused")))
            .unwrap();
        return Ok(response);
    }

    if wants_upgrade {
        let on_upgrade = hyper::upgrade::on(&mut req);
        tokio::spawn(async move {
            let Ok(upgraded) = on_upgrade.await else {
                return;
            };
            let mut io = TokioIo::new(upgraded);
            let mut buf = [0u8; 1024];
            loop {
                match io.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if io.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let response = Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .header(CONNECTION, "Upgrade")
            .header(UPGRADE, "websocket")
            .header("sec-websocket-accept", "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=")
            .header("x-origin", name)
            .body(Full::new(Bytes::new()))
            .unwrap();
        return Ok(response);
    }

    if path.ends_with("/redirect") {
        let response = Response::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION, "/api/landing")
            .header("x-origin", name)
            .body(Full::new(Bytes::new()))
            .unwrap();
        return Ok(response);
    }

    if path.ends_with("/fail") {
        let response = Response::builder()
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN_ALLOW)
            .header("x-origin", name)
            .body(Full::new(Bytes::from_static(b"origin down")))
            .unwrap();
        return Ok(response);
    }

    let method = req.method().to_string();
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_default();
    let host = header_string(&req, HOST);
    let upgrade = header_string(&req, UPGRADE);
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| hyper::header::HeaderValue::from_static("text/plain"));
    let body = req.into_body().collect().await.unwrap().to_bytes();

    let response = Response::builder()
        .header("x-origin", name)
        .header("x-seen-method", method)
        .header("x-seen-uri", uri)
        .header("x-seen-host", host)
        .header("x-seen-upgrade", upgrade)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN_ALLOW)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(body))
        .unwrap();
    Ok(response)
}

fn header_string(req: &Request<Incoming>, name: hyper::header::HeaderName) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_owned()
}

/// Start a router in front of the two origins and return its address.
pub async fn spawn_router(backend: SocketAddr, frontend: SocketAddr) -> SocketAddr {
    spawn_router_with(&format!("http://{backend}"), &format!("http://{frontend}")).await
}

pub async fn spawn_router_with(backend_origin: &str, frontend_origin: &str) -> SocketAddr {
    let routes = RouteTable::new(
        backend_origin,
        frontend_origin,
        DEFAULT_PATHS.iter().map(|p| p.to_string()).collect(),
    )
    .unwrap();
    let handler = Arc::new(ProxyHandler::new(routes, &UpstreamConfig::default()).unwrap());

    let listener = server::listener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::listener::run(
        listener,
        handler,
        std::future::pending::<()>(),
    ));
    addr
}

/// Client that never follows redirects, so tests see what the router sends.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Response to a hand-written request, as seen on the wire.
pub struct RawResponse {
    pub status: u16,
    /// Header lines, names lowercased
    pub headers: Vec<(String, String)>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Send `METHOD target` over a fresh connection without any client-side
/// URL cleanup, so the router sees the request target byte for byte.
pub async fn raw_request(router: SocketAddr, method: &str, target: &str) -> RawResponse {
    let mut stream = tokio::net::TcpStream::connect(router).await.unwrap();
    let request = format!(
        "{method} {target} HTTP/1.1\r\nHost: edge.example\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        stream.read_to_end(&mut raw),
    )
    .await
    .expect("response timed out")
    .unwrap();

    let text = String::from_utf8_lossy(&raw);
    let head = text.split("\r\n\r\n").next().unwrap_or_default();
    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split(' ').nth(1))
        .and_then(|code| code.parse().ok())
        .expect("missing status line");
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_owned()))
        .collect();

    RawResponse { status, headers }
}
