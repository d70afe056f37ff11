//! Classifier error types.

/// Unified error type for remote classification.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The HTTP request could not be sent or returned a transport error.
    #[error("classifier request failed: {reason}")]
    RequestFailed { reason: String },

    /// The request did not complete within the configured bound.
    #[error("classifier timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The endpoint answered with a non-success status.
    #[error("classifier returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode classifier response: {reason}")]
    BadResponse { reason: String },
}

/// Convenience alias used throughout the classifier crate.
pub type Result<T> = std::result::Result<T, ClassifierError>;
