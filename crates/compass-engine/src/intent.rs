//! Parsed intent types.
//!
//! [`Intent`] is a tagged union: each variant carries exactly the
//! parameters that intent needs, so downstream code never reaches into an
//! untyped parameter bag.

use serde::{Deserialize, Serialize};

pub use compass_surface::ScrollDirection;

/// Direction through session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryDirection {
    Back,
    Forward,
}

/// Which guided auth flow the user asked to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    SignUp,
    SignIn,
}

/// A canonical action category extracted from an utterance, with its
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Scroll {
        direction: ScrollDirection,
    },
    /// Browser-style history navigation.
    Navigate {
        direction: HistoryDirection,
    },
    /// Move keyboard focus through the tab order.
    TabNavigate {
        backward: bool,
    },
    Click {
        target: String,
    },
    /// Fill a named field, or the focused one when `target` is `None`.
    Fill {
        target: Option<String>,
        value: String,
    },
    Select {
        target: String,
        value: String,
    },
    Clear {
        target: Option<String>,
    },
    Focus {
        target: String,
    },
    Toggle {
        target: String,
    },
    Submit,
    /// Start a guided sign-up / sign-in workflow.
    AuthStart {
        mode: AuthMode,
    },
    /// Supply a named slot value ("my email is ..."), usually mid-workflow.
    FillSlot {
        slot: String,
        value: String,
    },
    /// Role selection, normalized to a canonical role string.
    SelectRole {
        role: String,
    },
    /// Read an element (or the page when `target` is `None`) back to the
    /// user.
    Read {
        target: Option<String>,
    },
    Help,
    WhereAmI,
    Confirm,
    Cancel,
    Unknown {
        text: String,
    },
}

impl Intent {
    /// Stable tag name, for logging and the remote vocabulary mapping.
    pub fn tag(&self) -> &'static str {
        match self {
            Intent::Scroll { .. } => "SCROLL",
            Intent::Navigate { .. } => "NAVIGATE",
            Intent::TabNavigate { .. } => "TAB_NAVIGATE",
            Intent::Click { .. } => "CLICK",
            Intent::Fill { .. } => "FILL",
            Intent::Select { .. } => "SELECT",
            Intent::Clear { .. } => "CLEAR",
            Intent::Focus { .. } => "FOCUS",
            Intent::Toggle { .. } => "TOGGLE",
            Intent::Submit => "SUBMIT",
            Intent::AuthStart { .. } => "AUTH_START",
            Intent::FillSlot { .. } => "FILL_SLOT",
            Intent::SelectRole { .. } => "SELECT_ROLE",
            Intent::Read { .. } => "READ",
            Intent::Help => "HELP",
            Intent::WhereAmI => "WHERE_AM_I",
            Intent::Confirm => "CONFIRM",
            Intent::Cancel => "CANCEL",
            Intent::Unknown { .. } => "UNKNOWN",
        }
    }
}

/// The result of classifying one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent: Intent,
    /// Classifier certainty in `[0, 1]`. `UNKNOWN` is always 0.
    pub confidence: f64,
    /// The rule text that matched, for diagnostics.
    pub raw_match: Option<String>,
}

impl ParsedIntent {
    /// The fallback result for text no rule matched.
    pub fn unknown(text: &str) -> Self {
        Self {
            intent: Intent::Unknown {
                text: text.to_string(),
            },
            confidence: 0.0,
            raw_match: None,
        }
    }
}
