//! Scripted classifier for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::Classifier;
use crate::error::{ClassifierError, Result};
use crate::types::{ClassifyRequest, ClassifyResponse};

/// A classifier that returns a canned response (or error) and counts calls.
///
/// The call counter is what lets tests prove the orchestrator's confidence
/// gate: a high-confidence local parse must leave the counter at zero.
pub struct MockClassifier {
    response: Mutex<Option<ClassifyResponse>>,
    calls: AtomicUsize,
    /// Artificial latency before answering, for timeout tests.
    delay: Option<Duration>,
}

impl MockClassifier {
    /// A classifier that always fails (no scripted response).
    pub fn failing() -> Self {
        Self {
            response: Mutex::new(None),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// A classifier that always answers with `response`.
    pub fn with_response(response: ClassifyResponse) -> Self {
        Self {
            response: Mutex::new(Some(response)),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Delay every answer by `delay` (to overrun a caller's timeout).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `classify` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _request: &ClassifyRequest) -> Result<ClassifyResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response
            .lock()
            .expect("mock lock")
            .clone()
            .ok_or(ClassifierError::RequestFailed {
                reason: "mock classifier scripted to fail".into(),
            })
    }
}
