use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyExt, Empty, StreamBody};
use hyper::body::Frame;
use hyper::{Response, StatusCode};

use crate::http::headers;
use crate::http::{BoxError, ProxyBody};

/// A body with no bytes.
pub fn empty() -> ProxyBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// A response carrying only a status line.
///
/// Used when an invocation fails outright; the router never writes its own
/// error pages.
pub fn status_only(status: StatusCode) -> Response<ProxyBody> {
    let mut response = Response::new(empty());
    *response.status_mut() = status;
    response
}

/// Stream an upstream body back to the client without collecting it.
pub fn stream_body(upstream: reqwest::Response) -> ProxyBody {
    let frames = upstream
        .bytes_stream()
        .map_ok(Frame::data)
        .map_err(BoxError::from);
    StreamBody::new(frames).boxed_unsync()
}

/// Relay an upstream response on a plain HTTP hop.
///
/// Status and body are upstream's as-is. Hop-by-hop headers are dropped
/// because they describe the upstream connection, not this one.
pub fn from_upstream(upstream: reqwest::Response) -> Response<ProxyBody> {
    let status = upstream.status();
    let headers = headers::forwardable_response(upstream.headers());

    let mut response = Response::new(stream_body(upstream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
