//! Request/response contract with the remote classifier.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::MAX_ELEMENT_SUMMARIES;

/// A compact description of one on-screen control, sent so the classifier
/// can ground its answer in what the user can actually see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSummary {
    /// Canonical action identifier, if the element carries one.
    pub action_id: Option<String>,
    /// Element category (button, link, text_input, ...).
    pub kind: String,
    /// Visible text, already truncated by the caller.
    pub text: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub disabled: bool,
}

/// Minimal page context accompanying a classification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContext {
    pub current_path: String,
    /// RFC 3339 timestamp of the request.
    pub timestamp: String,
}

impl PageContext {
    pub fn now(current_path: impl Into<String>) -> Self {
        Self {
            current_path: current_path.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A classification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub utterance: String,
    pub elements: Vec<ElementSummary>,
    pub context: PageContext,
}

impl ClassifyRequest {
    /// Build a request, truncating the element list to the wire cap.
    pub fn new(
        utterance: impl Into<String>,
        mut elements: Vec<ElementSummary>,
        context: PageContext,
    ) -> Self {
        elements.truncate(MAX_ELEMENT_SUMMARIES);
        Self {
            utterance: utterance.into(),
            elements,
            context,
        }
    }
}

/// The classifier's answer.
///
/// `intent` uses the remote vocabulary; the orchestrator owns the mapping
/// into local action verbs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub intent: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
    pub confidence: f64,
    /// Canonical action id of the element the classifier picked, if any.
    #[serde(default)]
    pub target_action: Option<String>,
    /// Suggested user-facing reply.
    #[serde(default)]
    pub reply: Option<String>,
}
