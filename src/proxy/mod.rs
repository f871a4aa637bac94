//! Edge routing
//!
//! This module implements the router itself: deciding which origin a request
//! belongs to, forwarding it there, and relaying the answer.

pub mod route;
pub mod tunnel;
pub mod upstream;

pub use route::{RouteOutcome, RouteTable};
pub use upstream::ProxyHandler;
