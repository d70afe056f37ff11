//! Intent orchestrator — one utterance in, one decision and reply out.
//!
//! The orchestrator owns the parser, the executor, the workflow engine, and
//! (optionally) a remote classifier, and wires them into a single decision
//! path per utterance:
//!
//! 1. parse locally;
//! 2. if a workflow is active, let it intercept confirmations, slot values,
//!    role choices, and cancellation;
//! 3. execute high-confidence parses immediately;
//! 4. below the low-confidence floor, consult the remote classifier under a
//!    hard time bound and translate its vocabulary into a local [`Intent`];
//! 5. if the remote path is unavailable, fails, or times out, fall back to
//!    the local parse (usually an apology for not understanding).
//!
//! Every utterance leaves a [`DecisionRecord`] in a bounded ring buffer for
//! diagnostics.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Captures;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use compass_classifier::{
    Classifier, ClassifyRequest, ClassifyResponse, ElementSummary, PageContext,
};
use compass_surface::{NodeKind, ScrollDirection, UiSurface};

use crate::config::EngineConfig;
use crate::element::{ElementIndex, IndexOptions, Resolver};
use crate::error::Result;
use crate::executor::{ActionExecutor, ActionResult, ActionTarget};
use crate::intent::{AuthMode, HistoryDirection, Intent, ParsedIntent};
use crate::parser::CommandParser;
use crate::workflow::{RunReport, StepOutcome, WorkflowEngine, WorkflowStatusView};

/// Resolver queries tried, in order, for a bare "submit".
const SUBMIT_CANDIDATES: &[&str] = &["signup-submit", "signin-submit", "verify-submit", "submit"];

/// Where the winning decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// The local pattern parser.
    Local,
    /// The active workflow intercepted the utterance.
    Workflow,
    /// The remote classifier.
    Remote,
}

/// One entry of the decision ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub utterance: String,
    /// Stable intent tag ("CLICK", "FILL_SLOT", ...).
    pub action: String,
    /// The element the action landed on: the resolved display name when
    /// execution reported one, otherwise the raw query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Canonical slot name, for slot fills and role choices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    /// The value driven into the page, when the action carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub confidence: f64,
    pub source: DecisionSource,
    pub success: bool,
    pub reply: String,
    pub at: DateTime<Utc>,
}

/// What the caller speaks or displays after an utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineReply {
    pub reply: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Top-level engine facade.
pub struct Orchestrator {
    config: EngineConfig,
    parser: CommandParser,
    executor: Arc<ActionExecutor>,
    workflows: WorkflowEngine,
    classifier: Option<Arc<dyn Classifier>>,
    decisions: VecDeque<DecisionRecord>,
}

impl Orchestrator {
    pub fn new(surface: Arc<dyn UiSurface>, config: EngineConfig) -> Self {
        let resolver = Arc::new(Resolver::new(config.clone()));
        let executor = Arc::new(ActionExecutor::new(surface, resolver));
        let workflows = WorkflowEngine::new(Arc::clone(&executor), &config);
        Self {
            config,
            parser: CommandParser::new(),
            executor,
            workflows,
            classifier: None,
            decisions: VecDeque::new(),
        }
    }

    /// Attach a remote classifier for low-confidence fallback.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Register a caller-defined command pattern (wins over built-ins).
    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        pattern: &str,
        extract: impl Fn(&Captures<'_>) -> Intent + Send + Sync + 'static,
    ) -> Result<()> {
        self.parser.register_command(name, pattern, extract)
    }

    pub fn unregister_command(&mut self, name: &str) -> bool {
        self.parser.unregister_command(name)
    }

    /// Classify an utterance without executing anything.
    pub fn parse(&self, text: &str) -> ParsedIntent {
        self.parser.parse(text)
    }

    /// Resolve a free-text element query against the current page.
    pub async fn find_element(&self, query: &str) -> Option<crate::element::ElementDescriptor> {
        self.executor.resolve_query(query).await
    }

    /// Direct access to the action primitives.
    pub fn executor(&self) -> &Arc<ActionExecutor> {
        &self.executor
    }

    pub fn workflow_status(&self) -> WorkflowStatusView {
        self.workflows.status()
    }

    /// The decision ring buffer, oldest first.
    pub fn recent_decisions(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.decisions.iter()
    }

    /// Handle one utterance end to end.
    pub async fn process_utterance(&mut self, text: &str) -> EngineReply {
        let parsed = self.parser.parse(text);
        debug!(
            utterance = text,
            intent = parsed.intent.tag(),
            confidence = parsed.confidence,
            "parsed"
        );

        // An active workflow gets first refusal on the utterance.
        if self.workflows.is_active() {
            if let Some((result, reply)) = self.intercept_for_workflow(&parsed.intent).await {
                return self.finish_turn(text, &parsed, DecisionSource::Workflow, result, reply);
            }
        }

        if parsed.confidence >= self.config.high_confidence {
            let (result, reply) = self.execute_intent(parsed.intent.clone()).await;
            return self.finish_turn(text, &parsed, DecisionSource::Local, result, reply);
        }

        if parsed.confidence < self.config.low_confidence {
            if let Some((remote, suggested)) = self.classify_remote(text).await {
                let (result, reply) = self.execute_intent(remote.intent.clone()).await;
                let reply = suggested.filter(|_| result.success).unwrap_or(reply);
                return self.finish_turn(text, &remote, DecisionSource::Remote, result, reply);
            }
        }

        // Mid-band parses run locally; a failed remote path falls back to
        // whatever the parser produced (usually UNKNOWN).
        let (result, reply) = self.execute_intent(parsed.intent.clone()).await;
        self.finish_turn(text, &parsed, DecisionSource::Local, result, reply)
    }

    // -----------------------------------------------------------------------
    // Workflow interception
    // -----------------------------------------------------------------------

    async fn intercept_for_workflow(
        &mut self,
        intent: &Intent,
    ) -> Option<(ActionResult, String)> {
        match intent {
            Intent::Cancel => {
                let name = self.workflows.active_name().unwrap_or("current").to_string();
                let result = self.workflows.cancel_workflow();
                Some((result, format!("Okay, I've stopped the {} flow.", flow_label(&name))))
            }
            Intent::Confirm => Some(self.drive_workflow().await),
            Intent::FillSlot { slot, value } => {
                self.workflows.add_data(slot, value);
                Some(self.drive_workflow().await)
            }
            Intent::SelectRole { role } => {
                self.workflows.add_data("role", role);
                Some(self.drive_workflow().await)
            }
            _ => None,
        }
    }

    /// Run the active workflow as far as it will go and phrase the outcome.
    async fn drive_workflow(&mut self) -> (ActionResult, String) {
        let name = self.workflows.active_name().unwrap_or_default().to_string();
        let report = self.workflows.run().await;
        let reply = workflow_reply(&name, &report);
        let result = match &report.outcome {
            StepOutcome::Failed { error } => ActionResult::fail(error.clone()),
            _ => report
                .results
                .last()
                .cloned()
                .unwrap_or_else(ActionResult::ok),
        };
        (result, reply)
    }

    // -----------------------------------------------------------------------
    // Remote fallback
    // -----------------------------------------------------------------------

    async fn classify_remote(&self, text: &str) -> Option<(ParsedIntent, Option<String>)> {
        let classifier = self.classifier.as_ref()?;

        let index =
            ElementIndex::build(self.executor.surface().as_ref(), IndexOptions::default()).await;
        let elements = index
            .entries
            .iter()
            .map(|e| ElementSummary {
                action_id: e.action_id.clone(),
                kind: kind_label(e.kind).to_string(),
                text: e.text.clone(),
                label: e.label.clone(),
                placeholder: e.placeholder.clone(),
                disabled: e.disabled,
            })
            .collect();
        let request = ClassifyRequest::new(
            text,
            elements,
            PageContext::now(self.executor.surface().current_path()),
        );

        let bound = Duration::from_secs(self.config.classifier_timeout_secs);
        let response = match tokio::time::timeout(bound, classifier.classify(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "remote classification failed");
                return None;
            }
            Err(_) => {
                warn!(seconds = bound.as_secs(), "remote classification timed out");
                return None;
            }
        };

        if response.confidence < self.config.low_confidence {
            debug!(confidence = response.confidence, "remote answer too uncertain");
            return None;
        }

        let intent = translate_remote(&response)?;
        info!(
            intent = intent.tag(),
            confidence = response.confidence,
            "using remote classification"
        );
        Some((
            ParsedIntent {
                intent,
                confidence: response.confidence,
                raw_match: Some(format!("remote:{}", response.intent)),
            },
            response.reply,
        ))
    }

    // -----------------------------------------------------------------------
    // Intent execution
    // -----------------------------------------------------------------------

    async fn execute_intent(&mut self, intent: Intent) -> (ActionResult, String) {
        match intent {
            Intent::Scroll { direction } => {
                let result = self.executor.scroll_page(direction).await;
                let reply = match direction {
                    ScrollDirection::Up => "Scrolled up.",
                    ScrollDirection::Down => "Scrolled down.",
                    ScrollDirection::Top => "Back at the top.",
                    ScrollDirection::Bottom => "At the bottom of the page.",
                };
                phrase(result, reply)
            }
            Intent::Navigate { direction } => {
                let result = self.executor.history_navigate(direction).await;
                let reply = match direction {
                    HistoryDirection::Back => "Went back.",
                    HistoryDirection::Forward => "Went forward.",
                };
                phrase(result, reply)
            }
            Intent::TabNavigate { backward } => {
                let result = self.executor.tab_navigate(backward).await;
                let name = data_str(&result, "focused");
                let reply = match name {
                    Some(name) if !name.is_empty() => format!("Focused {name}."),
                    _ => "Moved focus.".to_string(),
                };
                phrase(result, &reply)
            }
            Intent::Click { target } => {
                let result = self.executor.click_element(target.as_str()).await;
                let name = data_str(&result, "clicked").unwrap_or_else(|| target.clone());
                phrase(result, &format!("Clicked {name}."))
            }
            Intent::Fill { target, value } => {
                let (action_target, label) = match target {
                    Some(query) => (ActionTarget::from(query.as_str()), query),
                    None => (ActionTarget::Focused, "the field".to_string()),
                };
                let result = self.executor.fill_input(action_target, &value, true).await;
                phrase(result, &format!("Filled {label}."))
            }
            Intent::Select { target, value } => {
                let result = self
                    .executor
                    .select_from_dropdown(target.as_str(), &value)
                    .await;
                phrase(result, &format!("Selected {value}."))
            }
            Intent::Clear { target } => {
                let action_target = match &target {
                    Some(query) => ActionTarget::from(query.as_str()),
                    None => ActionTarget::Focused,
                };
                let result = self.executor.clear_input(action_target).await;
                phrase(result, "Cleared it.")
            }
            Intent::Focus { target } => {
                let result = self.executor.focus_element(target.as_str()).await;
                phrase(result, &format!("Focused {target}."))
            }
            Intent::Toggle { target } => {
                let result = self.executor.toggle_element(target.as_str()).await;
                let reply = match result.data.as_ref().and_then(|d| d["checked"].as_bool()) {
                    Some(true) => format!("Turned on {target}."),
                    Some(false) => format!("Turned off {target}."),
                    None => format!("Toggled {target}."),
                };
                phrase(result, &reply)
            }
            Intent::Submit => self.submit().await,
            Intent::AuthStart { mode } => {
                let workflow = match mode {
                    AuthMode::SignUp => "SIGNUP",
                    AuthMode::SignIn => "SIGNIN",
                };
                let started = self.workflows.start_workflow(workflow);
                if !started.success {
                    return phrase(started, "");
                }
                self.drive_workflow().await
            }
            Intent::FillSlot { slot, value } => {
                // Outside a workflow a slot value is just a field fill; the
                // slot name resolves through the keyword table.
                let result = self.executor.fill_input(slot.as_str(), &value, true).await;
                phrase(result, &format!("Filled your {slot}."))
            }
            Intent::SelectRole { role } => self.select_role(&role).await,
            Intent::Read { target } => self.read(target).await,
            Intent::Help => (ActionResult::ok(), help_text()),
            Intent::WhereAmI => {
                let path = self.executor.surface().current_path();
                (
                    ActionResult::ok(),
                    format!("You are on {}.", page_label(&path)),
                )
            }
            Intent::Confirm => (
                ActionResult::ok(),
                "There's nothing waiting for a confirmation.".to_string(),
            ),
            Intent::Cancel => (
                ActionResult::ok(),
                "There's nothing in progress to cancel.".to_string(),
            ),
            Intent::Unknown { text } => (
                ActionResult::fail(format!("no rule matched: {text}")),
                format!("Sorry, I didn't understand \"{text}\". Say \"help\" for what I can do."),
            ),
        }
    }

    async fn submit(&self) -> (ActionResult, String) {
        for candidate in SUBMIT_CANDIDATES {
            if self.executor.resolve_query(candidate).await.is_some() {
                let result = self.executor.click_element(*candidate).await;
                return phrase(result, "Submitted.");
            }
        }
        let result = ActionResult::fail("no submit control on this page");
        (result, "I can't find anything to submit here.".to_string())
    }

    async fn select_role(&mut self, role: &str) -> (ActionResult, String) {
        // Role cards take precedence over the form dropdown when both are
        // on screen.
        let card = format!("role-card-{role}");
        if self.executor.resolve_query(&card).await.is_some() {
            let result = self.executor.click_element(card.as_str()).await;
            return phrase(result, &format!("Selected the {role} role."));
        }
        let result = self.executor.select_from_dropdown("role-select", role).await;
        phrase(result, &format!("Selected the {role} role."))
    }

    async fn read(&self, target: Option<String>) -> (ActionResult, String) {
        match target {
            Some(query) => {
                let result = self.executor.read_element(query.as_str()).await;
                if !result.success {
                    return phrase(result, "");
                }
                let name = data_str(&result, "name").unwrap_or_default();
                let text = data_str(&result, "text").unwrap_or_default();
                let reply = if text.is_empty() || text == name {
                    format!("That is {name}.")
                } else {
                    format!("{name}: {text}")
                };
                (result, reply)
            }
            None => {
                let index =
                    ElementIndex::build(self.executor.surface().as_ref(), IndexOptions::default())
                        .await;
                let names: Vec<String> = index
                    .entries
                    .iter()
                    .take(8)
                    .map(|e| e.display_name())
                    .collect();
                let path = self.executor.surface().current_path();
                let reply = if names.is_empty() {
                    format!("You are on {}. I don't see anything interactive.", page_label(&path))
                } else {
                    format!(
                        "You are on {}. I can see: {}.",
                        page_label(&path),
                        names.join(", ")
                    )
                };
                (ActionResult::ok(), reply)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    fn finish_turn(
        &mut self,
        utterance: &str,
        parsed: &ParsedIntent,
        source: DecisionSource,
        result: ActionResult,
        reply: String,
    ) -> EngineReply {
        let (target, slot, value) = decision_fields(&parsed.intent, &result);
        self.decisions.push_back(DecisionRecord {
            utterance: utterance.to_string(),
            action: parsed.intent.tag().to_string(),
            target,
            slot,
            value,
            confidence: parsed.confidence,
            source,
            success: result.success,
            reply: reply.clone(),
            at: Utc::now(),
        });
        while self.decisions.len() > self.config.decision_history {
            self.decisions.pop_front();
        }

        EngineReply {
            reply,
            success: result.success,
            data: result.data,
        }
    }
}

/// Success keeps the canned phrase; failure speaks the error.
fn phrase(result: ActionResult, ok_reply: &str) -> (ActionResult, String) {
    let reply = if result.success {
        ok_reply.to_string()
    } else {
        result
            .error
            .clone()
            .unwrap_or_else(|| "That didn't work.".to_string())
    };
    (result, reply)
}

/// Pull the target, slot, and value a decision acted on. The target prefers
/// the element name execution resolved over the raw query.
fn decision_fields(
    intent: &Intent,
    result: &ActionResult,
) -> (Option<String>, Option<String>, Option<String>) {
    let resolved = ["clicked", "filled", "cleared", "focused", "toggled", "from", "name"]
        .iter()
        .find_map(|key| data_str(result, key));

    let (target, slot, value) = match intent {
        Intent::Click { target }
        | Intent::Focus { target }
        | Intent::Toggle { target } => (Some(target.clone()), None, None),
        Intent::Fill { target, value } => (target.clone(), None, Some(value.clone())),
        Intent::Select { target, value } => (Some(target.clone()), None, Some(value.clone())),
        Intent::Clear { target } | Intent::Read { target } => (target.clone(), None, None),
        Intent::FillSlot { slot, value } => (None, Some(slot.clone()), Some(value.clone())),
        Intent::SelectRole { role } => (None, Some("role".to_string()), Some(role.clone())),
        _ => (None, None, None),
    };
    (resolved.or(target), slot, value)
}

fn data_str(result: &ActionResult, key: &str) -> Option<String> {
    result
        .data
        .as_ref()
        .and_then(|d| d[key].as_str())
        .map(str::to_string)
}

fn workflow_reply(name: &str, report: &RunReport) -> String {
    match &report.outcome {
        StepOutcome::Completed => match name {
            "SIGNUP" => "You're signed up. Check your email for the verification code.".to_string(),
            "SIGNIN" => "You're signed in.".to_string(),
            "VERIFY_OTP" => "Verified. Welcome aboard.".to_string(),
            "SELECT_ROLE_CARD" => "Role selected.".to_string(),
            _ => "All done.".to_string(),
        },
        StepOutcome::NeedsInput { slot } => slot_prompt(slot),
        StepOutcome::Failed { error } => format!("I got stuck: {error}"),
        StepOutcome::Advanced => "Working on it.".to_string(),
    }
}

fn slot_prompt(slot: &str) -> String {
    match slot {
        "name" => "What's your full name?".to_string(),
        "email" => "What's your email address?".to_string(),
        "password" => "Please provide a password.".to_string(),
        "otp" => "Please tell me the verification code from your email.".to_string(),
        "role" => "Are you a student or a counsellor?".to_string(),
        other => format!("Please provide your {other}."),
    }
}

fn flow_label(name: &str) -> &str {
    match name {
        "SIGNUP" => "sign-up",
        "SIGNIN" => "sign-in",
        "VERIFY_OTP" => "verification",
        "SELECT_ROLE_CARD" => "role selection",
        other => other,
    }
}

fn page_label(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "the home page".to_string()
    } else {
        format!("the {} page", trimmed.replace(['/', '-'], " "))
    }
}

fn help_text() -> String {
    "You can say things like: \"scroll down\", \"go back\", \"click sign up\", \
     \"fill email with ada@example.com\", \"select counsellor from role\", \
     \"sign me up\", \"my email is ...\", \"read the page\", or \"cancel\"."
        .to_string()
}

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Button => "button",
        NodeKind::Link => "link",
        NodeKind::TextInput => "text_input",
        NodeKind::Textarea => "textarea",
        NodeKind::Select => "select",
        NodeKind::Option => "option",
        NodeKind::Checkbox => "checkbox",
        NodeKind::Radio => "radio",
        NodeKind::Toggle => "toggle",
        NodeKind::TaggedAction => "tagged_action",
        NodeKind::Other => "other",
    }
}

/// Map the remote vocabulary onto local intents. Unknown verbs and
/// incomplete parameter sets translate to `None`, which sends the caller
/// back to the local fallback.
fn translate_remote(response: &ClassifyResponse) -> Option<Intent> {
    let param = |key: &str| response.params.get(key).cloned();
    let target = || response.target_action.clone().or_else(|| param("target"));

    let intent = match response.intent.as_str() {
        "click_element" => Intent::Click { target: target()? },
        "fill_input" => Intent::Fill {
            target: target(),
            value: param("value")?,
        },
        "select_option" => Intent::Select {
            target: target()?,
            value: param("value")?,
        },
        "clear_input" => Intent::Clear { target: target() },
        "focus_element" => Intent::Focus { target: target()? },
        "toggle_element" => Intent::Toggle { target: target()? },
        "scroll" => Intent::Scroll {
            direction: match param("direction")?.as_str() {
                "up" => ScrollDirection::Up,
                "down" => ScrollDirection::Down,
                "top" => ScrollDirection::Top,
                "bottom" => ScrollDirection::Bottom,
                _ => return None,
            },
        },
        "navigate" => Intent::Navigate {
            direction: match param("direction")?.as_str() {
                "back" => HistoryDirection::Back,
                "forward" => HistoryDirection::Forward,
                _ => return None,
            },
        },
        "start_workflow" => Intent::AuthStart {
            mode: match param("workflow")?.as_str() {
                "SIGNUP" | "signup" => AuthMode::SignUp,
                "SIGNIN" | "signin" => AuthMode::SignIn,
                _ => return None,
            },
        },
        "submit" => Intent::Submit,
        "read_element" => Intent::Read { target: target() },
        "help" => Intent::Help,
        "where_am_i" => Intent::WhereAmI,
        _ => return None,
    };
    Some(intent)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
