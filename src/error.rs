use hyper::StatusCode;
use thiserror::Error;

/// Failures of a single routing invocation, or of router setup.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("invalid backend path prefix {0:?}: must start with '/' and not end with '/'")]
    InvalidPrefix(String),

    #[error("cannot build upstream URL {target:?}")]
    InvalidTarget {
        target: String,
        #[source]
        source: Option<url::ParseError>,
    },

    #[error("upstream request to {target} failed")]
    Upstream {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build upstream client")]
    Client(#[source] reqwest::Error),
}

impl ProxyError {
    /// Status returned to the caller when an invocation fails.
    ///
    /// Upstream error statuses never reach here; they are relayed as-is.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
