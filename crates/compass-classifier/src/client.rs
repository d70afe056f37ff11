//! The `Classifier` trait and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ClassifierError, Result};
use crate::types::{ClassifyRequest, ClassifyResponse};

/// Default request bound. The orchestrator treats anything slower than this
/// as "the user has moved on".
const DEFAULT_TIMEOUT_SECS: u64 = 8;

/// A service that can classify an utterance given page context.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: &ClassifyRequest) -> Result<ClassifyResponse>;
}

/// Configuration for connecting to a hosted classifier endpoint.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Full URL of the classify endpoint.
    pub endpoint: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Per-request bound.
    pub timeout: Duration,
}

impl ClassifierConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// JSON-over-HTTP classifier client.
pub struct HttpClassifier {
    config: ClassifierConfig,
    http: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifierError::RequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, request: &ClassifyRequest) -> Result<ClassifyResponse> {
        debug!(
            utterance = %request.utterance,
            elements = request.elements.len(),
            path = %request.context.current_path,
            "sending classification request"
        );

        let mut builder = self.http.post(&self.config.endpoint).json(request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout {
                    seconds: self.config.timeout.as_secs(),
                }
            } else {
                ClassifierError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: ClassifyResponse =
            response
                .json()
                .await
                .map_err(|e| ClassifierError::BadResponse {
                    reason: e.to_string(),
                })?;

        info!(
            intent = %decoded.intent,
            confidence = decoded.confidence,
            "remote classification received"
        );
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_eight_second_bound() {
        let config = ClassifierConfig::new("https://example.com/classify");
        assert_eq!(config.timeout, Duration::from_secs(8));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn config_builders_apply() {
        let config = ClassifierConfig::new("https://example.com/classify")
            .with_api_key("secret")
            .with_timeout(Duration::from_secs(2));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn http_classifier_is_constructable() {
        let config = ClassifierConfig::new("https://example.com/classify");
        assert!(HttpClassifier::new(config).is_ok());
    }
}
