//! Error types for calls against the proctoring server.

use crate::model::Endpoint;
use thiserror::Error;

/// Outcome of a failed request. Every server call returns one of these
/// instead of dropping the failure.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("{endpoint}: request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint}: request timed out")]
    Timeout { endpoint: Endpoint },

    #[error("{endpoint}: server returned HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },

    #[error("{endpoint}: malformed response: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

impl RequestError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            RequestError::Transport { endpoint, .. }
            | RequestError::Timeout { endpoint }
            | RequestError::Status { endpoint, .. }
            | RequestError::Decode { endpoint, .. } => *endpoint,
        }
    }

    pub(crate) fn from_reqwest(endpoint: Endpoint, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            RequestError::Timeout { endpoint }
        } else {
            RequestError::Transport { endpoint, source }
        }
    }
}
