//! Engine error types.
//!
//! Most of the engine's surface deliberately returns soft results
//! ([`crate::executor::ActionResult`], [`crate::workflow::StepOutcome`])
//! rather than errors, because "element not found" is a conversation turn,
//! not a fault. [`EngineError`] covers the cases that genuinely are faults:
//! bad configuration, invalid custom patterns, and upstream failures.

/// Unified error type for the command engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A custom command pattern failed to compile.
    #[error("invalid command pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Engine configuration could not be loaded or is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// An error propagated from the UI surface.
    #[error("surface error: {0}")]
    Surface(#[from] compass_surface::SurfaceError),

    /// An error propagated from the remote classifier client.
    #[error("classifier error: {0}")]
    Classifier(#[from] compass_classifier::ClassifierError),
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;
