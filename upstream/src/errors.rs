use thiserror::Error;

/// Transport-level failures of a single upstream call.
///
/// Every variant means the upstream could not be observed. None of them is a
/// domain answer; a 404 from an upstream is a successful call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    #[error("Upstream timeout for {0}")]
    Timeout(String),

    #[error("Could not connect to {0}: {1}")]
    Connect(String, String),

    #[error("Upstream request failed for {0}: {1}")]
    RequestFailed(String, String),

    #[error("Invalid upstream URL for {0}: {1}")]
    InvalidUrl(String, String),

    #[error("Invalid payload from {0}: {1}")]
    InvalidPayload(String, String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UpstreamError {
    /// Short tag used in metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Connect(..) => "connect",
            UpstreamError::RequestFailed(..) => "request",
            UpstreamError::InvalidUrl(..) => "invalid_url",
            UpstreamError::InvalidPayload(..) => "invalid_payload",
            UpstreamError::Internal(_) => "internal",
        }
    }
}
