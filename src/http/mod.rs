//! HTTP plumbing shared by the router.
//!
//! Parsing and connection management are hyper's job; this module holds the
//! pieces the router adds on top.
//!
//! # Architecture
//!
//! - **`headers`**: hop-by-hop filtering, WebSocket upgrade detection, CORS
//! - **`response`**: converting upstream responses into streamed hyper responses
//!
//! # Body flow
//!
//! ```text
//!   client ──Incoming──▶ router ──reqwest::Body (stream)──▶ origin
//!   client ◀──ProxyBody── router ◀──bytes_stream()──────── origin
//! ```
//!
//! Neither direction is buffered.

pub mod headers;
pub mod response;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Response body handed back to hyper
pub type ProxyBody = UnsyncBoxBody<Bytes, BoxError>;
