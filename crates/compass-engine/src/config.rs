//! Engine configuration.
//!
//! The matching thresholds and timing constants here are tuned heuristics,
//! not derived values — they ship as configuration precisely so deployments
//! can adjust them without a release.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Tunable knobs for matching, timing, and history bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum fuzzy score for a resolver candidate to win.
    pub fuzzy_threshold: f64,
    /// Score when the element's search text contains the whole query.
    pub score_element_contains_query: f64,
    /// Score when the query contains the element's whole search text.
    pub score_query_contains_element: f64,
    /// Weight applied to the fraction of query words found as substrings.
    pub score_word_overlap: f64,

    /// Local parses at or above this confidence are acted on directly.
    pub high_confidence: f64,
    /// Local parses below this confidence trigger the remote fallback. A
    /// remote answer must itself clear this value to be acted on: the same
    /// floor gates both ends, so a barely-confident remote guess cannot
    /// outrank a local parse that was already rejected.
    pub low_confidence: f64,

    /// How long the interaction highlight stays on an element, in ms.
    pub highlight_ms: u64,
    /// Settle delay after scrolling an element into view, in ms.
    pub settle_ms: u64,
    /// Settle delay after opening a dropdown, in ms.
    pub dropdown_settle_ms: u64,
    /// Settle delay after a page scroll, in ms.
    pub scroll_settle_ms: u64,
    /// Base per-character delay for simulated typing, in ms.
    pub type_char_ms: u64,
    /// Upper bound on the extra per-character jitter, in ms.
    pub type_jitter_ms: u64,

    /// Polling interval for `wait_for_element`, in ms.
    pub poll_interval_ms: u64,
    /// Default timeout for `wait_for_element`, in ms.
    pub wait_timeout_ms: u64,
    /// Bound on a remote classification round trip, in seconds.
    pub classifier_timeout_secs: u64,

    /// How many decision records the orchestrator retains.
    pub decision_history: usize,
    /// How many archived workflow instances are retained.
    pub workflow_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.5,
            score_element_contains_query: 0.9,
            score_query_contains_element: 0.7,
            score_word_overlap: 0.6,
            high_confidence: 0.8,
            low_confidence: 0.6,
            highlight_ms: 600,
            settle_ms: 150,
            dropdown_settle_ms: 200,
            scroll_settle_ms: 250,
            type_char_ms: 20,
            type_jitter_ms: 40,
            poll_interval_ms: 100,
            wait_timeout_ms: 2000,
            classifier_timeout_secs: 8,
            decision_history: 16,
            workflow_history: 32,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; unspecified fields keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fuzzy_threshold", self.fuzzy_threshold),
            ("high_confidence", self.high_confidence),
            ("low_confidence", self.low_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig {
                    reason: format!("{name} must be within [0, 1], got {value}"),
                });
            }
        }
        if self.low_confidence > self.high_confidence {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "low_confidence ({}) must not exceed high_confidence ({})",
                    self.low_confidence, self.high_confidence
                ),
            });
        }
        Ok(())
    }
}
