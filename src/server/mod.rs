//! TCP listener and per-connection HTTP serving

pub mod connection;
pub mod listener;
