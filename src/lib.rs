//! Edge router
//!
//! Splits traffic for a single-page app between two origins: API, upload,
//! WebSocket and file paths go to the backend, everything else to the static
//! frontend host.

pub mod config;
pub mod error;
pub mod http;
pub mod proxy;
pub mod server;
