//! Workflow engine — multi-step flows as a resumable state machine.
//!
//! A workflow template is an ordered list of steps over executor primitives.
//! At most one instance is active at a time. Execution advances step by
//! step: a step whose condition does not hold on the current page is
//! skipped, a step missing a required slot pauses the instance without
//! advancing (the caller asks the user and resumes with [`WorkflowEngine::add_data`]),
//! and a failed step leaves the cursor in place so the turn can be retried
//! or cancelled. Outcomes are values, never panics.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::executor::{ActionExecutor, ActionResult};

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// What a step does when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Fill the target field with the step's slot value.
    Fill,
    /// Click the target control.
    Click,
    /// Click a mode/tab switcher, usually guarded by a condition.
    SwitchMode,
    /// Choose the slot value from the target dropdown.
    Select,
}

/// Page predicate gating whether a step runs at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCondition {
    /// The query resolves to an element right now.
    ElementPresent(String),
    /// The query resolves to nothing right now.
    ElementAbsent(String),
    /// The current route contains the fragment.
    PathContains(String),
}

/// One step of a workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    /// Data slot this step consumes (`Fill`/`Select`, or a templated
    /// `Click` target).
    pub slot: Option<String>,
    /// Resolver query for the step's element. `{slot}` placeholders are
    /// substituted from collected data.
    pub target: String,
    /// Whether a missing slot pauses the workflow (`true`) or skips the
    /// step (`false`).
    pub required: bool,
    pub condition: Option<StepCondition>,
    /// After the step succeeds, wait for this query to resolve before
    /// advancing.
    pub wait_for: Option<String>,
}

impl Step {
    pub fn fill(slot: &str, target: &str) -> Self {
        Self {
            kind: StepKind::Fill,
            slot: Some(slot.to_string()),
            target: target.to_string(),
            required: true,
            condition: None,
            wait_for: None,
        }
    }

    pub fn click(target: &str) -> Self {
        Self {
            kind: StepKind::Click,
            slot: None,
            target: target.to_string(),
            required: true,
            condition: None,
            wait_for: None,
        }
    }

    pub fn switch_mode(target: &str) -> Self {
        Self {
            kind: StepKind::SwitchMode,
            slot: None,
            target: target.to_string(),
            required: true,
            condition: None,
            wait_for: None,
        }
    }

    pub fn select(slot: &str, target: &str) -> Self {
        Self {
            kind: StepKind::Select,
            slot: Some(slot.to_string()),
            target: target.to_string(),
            required: true,
            condition: None,
            wait_for: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_slot(mut self, slot: &str) -> Self {
        self.slot = Some(slot.to_string());
        self
    }

    pub fn when(mut self, condition: StepCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn then_wait_for(mut self, query: &str) -> Self {
        self.wait_for = Some(query.to_string());
        self
    }
}

/// A named, ordered plan of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    pub steps: Vec<Step>,
}

impl WorkflowTemplate {
    pub fn new(name: &str, steps: Vec<Step>) -> Self {
        Self {
            name: name.to_string(),
            steps,
        }
    }

    /// Look up a built-in template by its canonical name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "SIGNUP" => Some(Self::new(
                "SIGNUP",
                vec![
                    Step::switch_mode("signup-tab")
                        .when(StepCondition::ElementPresent("signup-tab".into())),
                    Step::fill("name", "signup-name"),
                    Step::fill("email", "signup-email"),
                    Step::fill("password", "signup-password"),
                    Step::select("role", "role-select"),
                    Step::click("signup-submit").then_wait_for("otp-input"),
                ],
            )),
            "SIGNIN" => Some(Self::new(
                "SIGNIN",
                vec![
                    Step::switch_mode("signin-tab")
                        .when(StepCondition::ElementPresent("signin-tab".into())),
                    Step::fill("email", "signin-email"),
                    Step::fill("password", "signin-password"),
                    Step::click("signin-submit"),
                ],
            )),
            "VERIFY_OTP" => Some(Self::new(
                "VERIFY_OTP",
                vec![
                    Step::fill("otp", "otp-input"),
                    Step::click("verify-submit"),
                ],
            )),
            "SELECT_ROLE_CARD" => Some(Self::new(
                "SELECT_ROLE_CARD",
                vec![Step::click("role-card-{role}").with_slot("role")],
            )),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    Completed,
    Cancelled,
}

/// A running (or just-finished) workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: Uuid,
    pub name: String,
    pub steps: Vec<Step>,
    pub current_step: usize,
    pub data: HashMap<String, String>,
    pub status: WorkflowStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    fn new(template: WorkflowTemplate) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: template.name,
            steps: template.steps,
            current_step: 0,
            data: HashMap::new(),
            status: WorkflowStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// What happened when one step was attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step (or a skipped step) moved the cursor forward.
    Advanced,
    /// The final step finished; the instance is done.
    Completed,
    /// A required slot has no value; the cursor did not move.
    NeedsInput { slot: String },
    /// The step's action failed; the cursor did not move.
    Failed { error: String },
}

/// Where a driver run stopped, with the action results it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: StepOutcome,
    pub results: Vec<ActionResult>,
}

/// Caller-facing snapshot of the active instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatusView {
    pub active: bool,
    pub name: Option<String>,
    pub step: usize,
    pub total_steps: usize,
    /// Slot names collected so far (values withheld; they include passwords).
    pub collected: Vec<String>,
}

/// Finished-instance record kept in the bounded history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: Uuid,
    pub name: String,
    pub status: WorkflowStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives workflow instances over the action executor.
pub struct WorkflowEngine {
    executor: Arc<ActionExecutor>,
    active: Option<WorkflowInstance>,
    history: VecDeque<WorkflowRecord>,
    history_cap: usize,
}

impl WorkflowEngine {
    pub fn new(executor: Arc<ActionExecutor>, config: &EngineConfig) -> Self {
        Self {
            executor,
            active: None,
            history: VecDeque::new(),
            history_cap: config.workflow_history,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|i| i.name.as_str())
    }

    /// Finished instances, newest last.
    pub fn history(&self) -> impl Iterator<Item = &WorkflowRecord> {
        self.history.iter()
    }

    /// Status snapshot for replies and debugging.
    pub fn status(&self) -> WorkflowStatusView {
        match &self.active {
            Some(instance) => {
                let mut collected: Vec<String> = instance.data.keys().cloned().collect();
                collected.sort();
                WorkflowStatusView {
                    active: true,
                    name: Some(instance.name.clone()),
                    step: instance.current_step,
                    total_steps: instance.steps.len(),
                    collected,
                }
            }
            None => WorkflowStatusView {
                active: false,
                name: None,
                step: 0,
                total_steps: 0,
                collected: Vec::new(),
            },
        }
    }

    /// Start a built-in workflow by name. An already-active instance is
    /// cancelled first; there is never more than one.
    pub fn start_workflow(&mut self, name: &str) -> ActionResult {
        match WorkflowTemplate::builtin(name) {
            Some(template) => self.start_template(template),
            None => ActionResult::fail(format!("Unknown workflow: {name}")),
        }
    }

    /// Start from an explicit template.
    ///
    /// Deliberately cancel-and-replace rather than refuse: the user asking
    /// for a new flow mid-flow means they abandoned the first one. The old
    /// instance is archived as cancelled, so at most one is ever active.
    pub fn start_template(&mut self, template: WorkflowTemplate) -> ActionResult {
        if let Some(previous) = self.active.take() {
            warn!(previous = %previous.name, next = %template.name, "replacing active workflow");
            self.finish(previous, WorkflowStatus::Cancelled);
        }
        let instance = WorkflowInstance::new(template);
        info!(workflow = %instance.name, id = %instance.id, "workflow started");
        self.active = Some(instance);
        ActionResult::ok()
    }

    /// Supply a slot value to the active instance.
    pub fn add_data(&mut self, slot: &str, value: &str) -> ActionResult {
        match &mut self.active {
            Some(instance) => {
                debug!(workflow = %instance.name, slot, "slot filled");
                instance.data.insert(slot.to_string(), value.to_string());
                ActionResult::ok()
            }
            None => ActionResult::fail("No workflow is in progress"),
        }
    }

    /// Cancel the active instance.
    pub fn cancel_workflow(&mut self) -> ActionResult {
        match self.active.take() {
            Some(instance) => {
                let name = instance.name.clone();
                info!(workflow = %name, "workflow cancelled");
                self.finish(instance, WorkflowStatus::Cancelled);
                ActionResult::ok_with(serde_json::json!({ "cancelled": name }))
            }
            None => ActionResult::fail("No workflow is in progress"),
        }
    }

    /// Attempt the current step once, skipping over steps whose condition
    /// does not hold.
    pub async fn execute_next_step(&mut self) -> (StepOutcome, Option<ActionResult>) {
        let Some(instance) = self.active.as_mut() else {
            return (
                StepOutcome::Failed {
                    error: "No workflow is in progress".to_string(),
                },
                None,
            );
        };

        // Skip condition-gated steps that do not apply to this page.
        loop {
            let Some(condition) = instance
                .steps
                .get(instance.current_step)
                .and_then(|step| step.condition.clone())
            else {
                break;
            };
            if Self::condition_holds(&self.executor, &condition).await {
                break;
            }
            debug!(
                workflow = %instance.name,
                step = instance.current_step,
                "condition not met, step skipped"
            );
            instance.current_step += 1;
        }

        let Some(step) = instance.steps.get(instance.current_step).cloned() else {
            let done = self.active.take().expect("instance checked above");
            info!(workflow = %done.name, "workflow completed");
            self.finish(done, WorkflowStatus::Completed);
            return (StepOutcome::Completed, None);
        };

        // Required slot with no value pauses the instance in place.
        let slot_value = step.slot.as_ref().and_then(|s| instance.data.get(s)).cloned();
        if step.slot.is_some() && slot_value.is_none() {
            let slot = step.slot.clone().unwrap_or_default();
            if step.required {
                debug!(workflow = %instance.name, slot = %slot, "paused for input");
                return (StepOutcome::NeedsInput { slot }, None);
            }
            instance.current_step += 1;
            return (StepOutcome::Advanced, None);
        }

        let target = render_target(&step.target, &instance.data);

        // Step targets get a bounded wait: mode switches and submits often
        // reveal the next step's controls a beat later.
        let Some(element) = self.executor.wait_for(&target).await else {
            let error = format!("Element not found: {target}");
            warn!(workflow = %self.active_name().unwrap_or("?"), error = %error, "step failed");
            return (
                StepOutcome::Failed {
                    error: error.clone(),
                },
                Some(ActionResult::fail(error)),
            );
        };

        let result = match step.kind {
            StepKind::Fill => {
                self.executor
                    .fill_input(element, slot_value.as_deref().unwrap_or(""), false)
                    .await
            }
            StepKind::Click | StepKind::SwitchMode => self.executor.click_element(element).await,
            StepKind::Select => {
                self.executor
                    .select_from_dropdown(element, slot_value.as_deref().unwrap_or(""))
                    .await
            }
        };

        if !result.success {
            let error = result
                .error
                .clone()
                .unwrap_or_else(|| "step failed".to_string());
            warn!(workflow = %self.active_name().unwrap_or("?"), error = %error, "step failed");
            return (StepOutcome::Failed { error }, Some(result));
        }

        if let Some(query) = &step.wait_for {
            if self.executor.wait_for(query).await.is_none() {
                let error = format!("Expected {query} to appear, but it never did");
                return (StepOutcome::Failed { error }, Some(result));
            }
        }

        let instance = self.active.as_mut().expect("instance checked above");
        instance.current_step += 1;
        if instance.current_step >= instance.steps.len() {
            let done = self.active.take().expect("instance checked above");
            info!(workflow = %done.name, "workflow completed");
            self.finish(done, WorkflowStatus::Completed);
            return (StepOutcome::Completed, Some(result));
        }
        (StepOutcome::Advanced, Some(result))
    }

    /// Convenience driver: start a built-in workflow with initial data and
    /// run it until it completes, pauses for input, or fails.
    pub async fn execute_workflow(
        &mut self,
        name: &str,
        data: HashMap<String, String>,
    ) -> RunReport {
        let started = self.start_workflow(name);
        if !started.success {
            let error = started
                .error
                .clone()
                .unwrap_or_else(|| "workflow failed to start".to_string());
            return RunReport {
                outcome: StepOutcome::Failed { error },
                results: vec![started],
            };
        }
        if let Some(instance) = self.active.as_mut() {
            instance.data.extend(data);
        }
        self.run().await
    }

    /// Drive the active instance until it completes, pauses for input, or
    /// fails. Results of the executed steps are returned in order.
    pub async fn run(&mut self) -> RunReport {
        let mut results = Vec::new();
        loop {
            let (outcome, result) = self.execute_next_step().await;
            if let Some(result) = result {
                results.push(result);
            }
            match outcome {
                StepOutcome::Advanced => continue,
                other => {
                    return RunReport {
                        outcome: other,
                        results,
                    };
                }
            }
        }
    }

    async fn condition_holds(executor: &ActionExecutor, condition: &StepCondition) -> bool {
        match condition {
            StepCondition::ElementPresent(query) => {
                executor.resolve_query(query).await.is_some()
            }
            StepCondition::ElementAbsent(query) => executor.resolve_query(query).await.is_none(),
            StepCondition::PathContains(fragment) => {
                executor.surface().current_path().contains(fragment)
            }
        }
    }

    fn finish(&mut self, mut instance: WorkflowInstance, status: WorkflowStatus) {
        instance.status = status;
        instance.completed_at = Some(Utc::now());
        self.history.push_back(WorkflowRecord {
            id: instance.id,
            name: instance.name,
            status,
            started_at: instance.started_at,
            finished_at: instance.completed_at.unwrap_or_else(Utc::now),
        });
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }
    }
}

/// Substitute `{slot}` placeholders in a step target from collected data.
fn render_target(target: &str, data: &HashMap<String, String>) -> String {
    let mut rendered = target.to_string();
    for (slot, value) in data {
        rendered = rendered.replace(&format!("{{{slot}}}"), value);
    }
    rendered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::element::Resolver;
    use compass_surface::{MockSurface, NodeSpec, SurfaceEvent, UiSurface};

    fn fast_config() -> EngineConfig {
        EngineConfig {
            highlight_ms: 1,
            settle_ms: 1,
            dropdown_settle_ms: 1,
            scroll_settle_ms: 1,
            type_char_ms: 0,
            type_jitter_ms: 0,
            poll_interval_ms: 5,
            wait_timeout_ms: 200,
            ..EngineConfig::default()
        }
    }

    fn engine_on(surface: Arc<MockSurface>) -> WorkflowEngine {
        let config = fast_config();
        let executor = Arc::new(ActionExecutor::new(
            surface,
            Arc::new(Resolver::new(config.clone())),
        ));
        WorkflowEngine::new(executor, &config)
    }

    /// Auth page with both mode tabs, the signup form, and a hidden OTP
    /// field revealed by submitting.
    fn auth_page() -> Arc<MockSurface> {
        let surface = Arc::new(MockSurface::new("/auth"));
        surface.add(NodeSpec::button("Sign In").action_id("signin-tab").at(0.0, 0.0));
        surface.add(NodeSpec::button("Sign Up").action_id("signup-tab").at(210.0, 0.0));
        surface.add(NodeSpec::text_input("name").action_id("signup-name").at(0.0, 50.0));
        surface.add(NodeSpec::text_input("email").action_id("signup-email").at(0.0, 100.0));
        surface.add(
            NodeSpec::text_input("password")
                .action_id("signup-password")
                .input_type("password")
                .at(0.0, 150.0),
        );
        surface.add(
            NodeSpec::select(
                "role",
                vec![("student", "Student"), ("counsellor", "Counsellor")],
            )
            .action_id("role-select")
            .at(0.0, 200.0),
        );
        let submit =
            surface.add(NodeSpec::button("Create account").action_id("signup-submit").at(0.0, 250.0));
        let otp = surface.add(
            NodeSpec::text_input("otp")
                .action_id("otp-input")
                .at(0.0, 300.0)
                .hidden(),
        );
        surface.on_click(submit, move |page| page.set_hidden(otp, false));
        surface
    }

    #[tokio::test]
    async fn signup_pauses_for_each_missing_slot() {
        let surface = auth_page();
        let mut engine = engine_on(surface);

        assert!(engine.start_workflow("SIGNUP").success);
        let report = engine.run().await;
        assert_eq!(
            report.outcome,
            StepOutcome::NeedsInput {
                slot: "name".into()
            }
        );
        // The mode switch ran before the pause.
        assert_eq!(engine.status().step, 1);

        engine.add_data("name", "Ada Lovelace");
        let report = engine.run().await;
        assert_eq!(
            report.outcome,
            StepOutcome::NeedsInput {
                slot: "email".into()
            }
        );
    }

    #[tokio::test]
    async fn signup_completes_with_all_slots() {
        let surface = auth_page();
        let mut engine = engine_on(surface.clone());

        let data: HashMap<String, String> = [
            ("name", "Ada Lovelace"),
            ("email", "ada@example.com"),
            ("password", "hunter2!"),
            ("role", "Student"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let report = engine.execute_workflow("SIGNUP", data).await;
        assert_eq!(report.outcome, StepOutcome::Completed, "{report:?}");
        assert!(report.results.iter().all(|r| r.success));
        assert!(!engine.is_active());

        // Fields were filled, the role chosen, and the submit clicked.
        let nodes = surface.interactive_nodes().await;
        let value_of = |action: &str| {
            nodes
                .iter()
                .find(|n| n.action_id.as_deref() == Some(action))
                .map(|n| n.value.clone())
                .unwrap_or_default()
        };
        assert_eq!(value_of("signup-name"), "Ada Lovelace");
        assert_eq!(value_of("signup-email"), "ada@example.com");
        assert_eq!(value_of("role-select"), "student");
        assert!(!nodes
            .iter()
            .find(|n| n.action_id.as_deref() == Some("otp-input"))
            .unwrap()
            .hidden);

        let record = engine.history().last().expect("history record");
        assert_eq!(record.name, "SIGNUP");
        assert_eq!(record.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn switch_mode_is_skipped_when_tab_absent() {
        // A page already in signup mode: no tabs at all.
        let surface = Arc::new(MockSurface::new("/auth"));
        surface.add(NodeSpec::text_input("name").action_id("signup-name"));
        let mut engine = engine_on(surface);

        engine.start_workflow("SIGNUP");
        engine.add_data("name", "Ada");
        let report = engine.run().await;

        // Paused on email, with the switch step skipped and the name fill
        // done: cursor sits on step index 2.
        assert_eq!(
            report.outcome,
            StepOutcome::NeedsInput {
                slot: "email".into()
            }
        );
        assert_eq!(engine.status().step, 2);
    }

    #[tokio::test]
    async fn failed_step_keeps_cursor_and_instance() {
        // Signup form without a submit button: the last step fails.
        let surface = auth_page();
        surface.with_page(|page| {
            let submit = page
                .nodes
                .iter()
                .find(|n| n.action_id.as_deref() == Some("signup-submit"))
                .map(|n| n.id)
                .unwrap();
            page.remove(submit);
        });
        let mut engine = engine_on(surface);

        engine.start_workflow("SIGNUP");
        engine.add_data("name", "Ada");
        engine.add_data("email", "ada@example.com");
        engine.add_data("password", "hunter2!");
        engine.add_data("role", "Student");

        let report = engine.run().await;
        let StepOutcome::Failed { error } = report.outcome else {
            panic!("expected failure, got {:?}", report.outcome);
        };
        assert!(error.contains("Element not found"), "{error}");
        assert!(engine.is_active());
        assert_eq!(engine.status().step, 5);
    }

    #[tokio::test]
    async fn cancel_records_history_and_clears_instance() {
        let surface = auth_page();
        let mut engine = engine_on(surface);

        engine.start_workflow("SIGNUP");
        assert!(engine.is_active());

        let result = engine.cancel_workflow();
        assert!(result.success);
        assert!(!engine.is_active());
        assert_eq!(
            engine.history().last().unwrap().status,
            WorkflowStatus::Cancelled
        );

        // Cancelling again is a soft error.
        assert!(!engine.cancel_workflow().success);
    }

    #[tokio::test]
    async fn starting_replaces_active_instance() {
        let surface = auth_page();
        let mut engine = engine_on(surface);

        engine.start_workflow("SIGNUP");
        engine.start_workflow("SIGNIN");

        assert_eq!(engine.active_name(), Some("SIGNIN"));
        assert_eq!(
            engine.history().last().unwrap().status,
            WorkflowStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn unknown_workflow_refuses_to_start() {
        let surface = Arc::new(MockSurface::new("/"));
        let mut engine = engine_on(surface);

        let result = engine.start_workflow("MAKE_COFFEE");
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unknown workflow"));

        let report = engine.execute_workflow("MAKE_COFFEE", HashMap::new()).await;
        assert!(matches!(report.outcome, StepOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn add_data_without_workflow_is_soft_error() {
        let surface = Arc::new(MockSurface::new("/"));
        let mut engine = engine_on(surface);
        let result = engine.add_data("email", "a@b.com");
        assert!(!result.success);
        assert!(result.error.unwrap().contains("No workflow"));
    }

    #[tokio::test]
    async fn role_card_target_is_templated_from_slot() {
        let surface = Arc::new(MockSurface::new("/onboarding"));
        let student =
            surface.add(NodeSpec::button("I am a student").action_id("role-card-student"));
        surface.add(NodeSpec::button("I am a counsellor").action_id("role-card-counsellor"));
        let mut engine = engine_on(surface.clone());

        engine.start_workflow("SELECT_ROLE_CARD");
        let report = engine.run().await;
        assert_eq!(
            report.outcome,
            StepOutcome::NeedsInput {
                slot: "role".into()
            }
        );

        engine.add_data("role", "student");
        let report = engine.run().await;
        assert_eq!(report.outcome, StepOutcome::Completed);
        assert!(surface.events().contains(&SurfaceEvent::Clicked(student)));
    }

    #[tokio::test]
    async fn optional_step_without_slot_is_skipped() {
        let surface = Arc::new(MockSurface::new("/"));
        surface.add(NodeSpec::button("Done").action_id("finish"));
        let mut engine = engine_on(surface);

        engine.start_template(WorkflowTemplate::new(
            "CUSTOM",
            vec![
                Step::fill("nickname", "nickname-input").optional(),
                Step::click("finish"),
            ],
        ));
        let report = engine.run().await;
        assert_eq!(report.outcome, StepOutcome::Completed);
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let surface = Arc::new(MockSurface::new("/"));
        let mut engine = engine_on(surface);

        for _ in 0..40 {
            engine.start_workflow("SIGNIN");
            engine.cancel_workflow();
        }
        assert_eq!(engine.history().count(), fast_config().workflow_history);
    }

    #[test]
    fn builtin_templates_exist() {
        for name in ["SIGNUP", "SIGNIN", "VERIFY_OTP", "SELECT_ROLE_CARD"] {
            assert!(WorkflowTemplate::builtin(name).is_some(), "{name}");
        }
        assert!(WorkflowTemplate::builtin("NOPE").is_none());
    }
}
