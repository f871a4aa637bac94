use hyper::HeaderMap;
use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, HOST, HeaderName, HeaderValue, UPGRADE};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    // HeaderName::as_str is always lowercase
    HOP_BY_HOP.contains(&name.as_str())
}

/// True when the request asks to switch to the WebSocket protocol.
///
/// The token is compared case-insensitively, as protocol names are in
/// RFC 9110, so `Upgrade: WebSocket` counts as well as `websocket`.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"))
}

/// Request headers for a plain HTTP hop.
///
/// Drops `Host` (the client sets it from the target URL) and hop-by-hop
/// headers. Everything else, including repeated headers, passes through.
pub fn forwardable_request(headers: &HeaderMap) -> HeaderMap {
    filtered(headers, |name| *name != HOST && !is_hop_by_hop(name))
}

/// Request headers for a WebSocket handshake. Only `Host` is replaced;
/// `Connection` and `Upgrade` must reach the origin.
pub fn forwardable_upgrade(headers: &HeaderMap) -> HeaderMap {
    filtered(headers, |name| *name != HOST)
}

/// Upstream response headers relayed on a plain HTTP hop.
pub fn forwardable_response(headers: &HeaderMap) -> HeaderMap {
    filtered(headers, |name| !is_hop_by_hop(name))
}

/// Force `Access-Control-Allow-Origin: *`, replacing any value upstream set.
pub fn force_allow_any_origin(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
}

fn filtered(headers: &HeaderMap, keep: impl Fn(&HeaderName) -> bool) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if keep(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}
