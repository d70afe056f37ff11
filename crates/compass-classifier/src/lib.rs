//! Remote intent classifier client for Compass Assist.
//!
//! When local pattern matching is unsure, the orchestrator can consult a
//! hosted classifier with the utterance, a capped summary of the on-screen
//! controls, and minimal page context. This crate defines that contract:
//!
//! - [`Classifier`]: the async trait the engine depends on.
//! - [`HttpClassifier`]: JSON-over-HTTP implementation with a bounded
//!   timeout.
//! - [`mock::MockClassifier`]: scripted test double with call counting.
//!
//! Classifier failures are ordinary errors, never panics; the orchestrator
//! treats any failure as "no better alternative than the local result".

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::{Classifier, ClassifierConfig, HttpClassifier};
pub use error::{ClassifierError, Result};
pub use types::{ClassifyRequest, ClassifyResponse, ElementSummary, PageContext};

/// Hard cap on how many element summaries a request may carry.
pub const MAX_ELEMENT_SUMMARIES: usize = 30;
