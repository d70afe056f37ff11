//! Action executor — primitive UI operations with visual feedback.
//!
//! Every primitive resolves its target, fails fast with a descriptive
//! message if the target is missing or disabled, scrolls it into view when
//! needed, applies a transient highlight, performs the native interaction,
//! and reports an [`ActionResult`]. Nothing here panics or propagates
//! errors: "element not found" is a reply to the user, not a fault, so even
//! internal surface errors are normalized into `{success: false, error}`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use compass_surface::{
    HighlightKind, NodeId, NodeKind, NodeSnapshot, ScrollDirection, UiSurface,
};

use crate::element::{ElementDescriptor, ElementIndex, IndexOptions, Resolver};
use crate::intent::HistoryDirection;

/// The soft result every primitive returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    pub fn ok_with(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
        }
    }
}

/// What a primitive operates on: a pre-resolved descriptor, a raw surface
/// node, a free-text query resolved internally, or whatever currently holds
/// focus.
#[derive(Debug, Clone)]
pub enum ActionTarget {
    Descriptor(ElementDescriptor),
    Node(NodeId),
    Query(String),
    Focused,
}

impl From<ElementDescriptor> for ActionTarget {
    fn from(descriptor: ElementDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl From<NodeId> for ActionTarget {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for ActionTarget {
    fn from(query: &str) -> Self {
        Self::Query(query.to_string())
    }
}

impl From<String> for ActionTarget {
    fn from(query: String) -> Self {
        Self::Query(query)
    }
}

/// Executes primitive UI operations against the surface.
pub struct ActionExecutor {
    surface: Arc<dyn UiSurface>,
    resolver: Arc<Resolver>,
}

impl ActionExecutor {
    pub fn new(surface: Arc<dyn UiSurface>, resolver: Arc<Resolver>) -> Self {
        Self { surface, resolver }
    }

    pub fn surface(&self) -> &Arc<dyn UiSurface> {
        &self.surface
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Resolve a free-text query against a fresh index.
    pub async fn resolve_query(&self, query: &str) -> Option<ElementDescriptor> {
        let index = ElementIndex::build(self.surface.as_ref(), IndexOptions::default()).await;
        self.resolver.resolve(query, &index)
    }

    /// Bounded wait for a query to resolve, at the configured poll rate.
    pub async fn wait_for(&self, query: &str) -> Option<ElementDescriptor> {
        self.resolver
            .wait_for_default(self.surface.as_ref(), query)
            .await
    }

    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    /// Click a control.
    pub async fn click_element(&self, target: impl Into<ActionTarget>) -> ActionResult {
        let element = match self.prepare(target.into(), HighlightKind::Action).await {
            Ok(element) => element,
            Err(result) => return result,
        };

        debug!(element = %element.display_name(), "click");
        match self.surface.click(element.node).await {
            Ok(()) => ActionResult::ok_with(json!({ "clicked": element.display_name() })),
            Err(e) => ActionResult::fail(format!(
                "Could not click {}: {e}",
                element.display_name()
            )),
        }
    }

    /// Fill a text field, optionally simulating character-by-character
    /// typing. With `ActionTarget::Focused` the currently focused field is
    /// used.
    pub async fn fill_input(
        &self,
        target: impl Into<ActionTarget>,
        value: &str,
        simulate_typing: bool,
    ) -> ActionResult {
        let element = match self.prepare(target.into(), HighlightKind::Fill).await {
            Ok(element) => element,
            Err(result) => return result,
        };
        if !element.kind.editable() && element.kind != NodeKind::Select {
            return ActionResult::fail(format!(
                "{} is not a text field",
                element.display_name()
            ));
        }

        if let Err(e) = self.surface.focus(element.node).await {
            return ActionResult::fail(format!("Could not focus {}: {e}", element.display_name()));
        }

        let outcome = if simulate_typing {
            self.type_characters(element.node, value).await
        } else {
            self.surface.set_value(element.node, value).await
        };
        if let Err(e) = outcome {
            return ActionResult::fail(format!("Could not fill {}: {e}", element.display_name()));
        }

        // Reactive UI layers observe the edit through the change dispatch.
        if let Err(e) = self.surface.dispatch_change(element.node).await {
            return ActionResult::fail(format!("Change dispatch failed: {e}"));
        }

        debug!(element = %element.display_name(), chars = value.len(), "filled");
        ActionResult::ok_with(json!({ "filled": element.display_name(), "length": value.len() }))
    }

    /// Clear a field's value (the focused one for `ActionTarget::Focused`).
    pub async fn clear_input(&self, target: impl Into<ActionTarget>) -> ActionResult {
        let element = match self.prepare(target.into(), HighlightKind::Fill).await {
            Ok(element) => element,
            Err(result) => return result,
        };
        if let Err(e) = self.surface.set_value(element.node, "").await {
            return ActionResult::fail(format!("Could not clear {}: {e}", element.display_name()));
        }
        if let Err(e) = self.surface.dispatch_change(element.node).await {
            return ActionResult::fail(format!("Change dispatch failed: {e}"));
        }
        ActionResult::ok_with(json!({ "cleared": element.display_name() }))
    }

    /// Move keyboard focus to a control.
    pub async fn focus_element(&self, target: impl Into<ActionTarget>) -> ActionResult {
        let element = match self.prepare(target.into(), HighlightKind::Focus).await {
            Ok(element) => element,
            Err(result) => return result,
        };
        match self.surface.focus(element.node).await {
            Ok(()) => ActionResult::ok_with(json!({ "focused": element.display_name() })),
            Err(e) => ActionResult::fail(format!(
                "Could not focus {}: {e}",
                element.display_name()
            )),
        }
    }

    /// Flip a checkbox/toggle and report the new state.
    pub async fn toggle_element(&self, target: impl Into<ActionTarget>) -> ActionResult {
        let element = match self.prepare(target.into(), HighlightKind::Action).await {
            Ok(element) => element,
            Err(result) => return result,
        };
        if let Err(e) = self.surface.click(element.node).await {
            return ActionResult::fail(format!(
                "Could not toggle {}: {e}",
                element.display_name()
            ));
        }
        let checked = self
            .surface
            .node(element.node)
            .await
            .and_then(|n| n.checked);
        ActionResult::ok_with(json!({ "toggled": element.display_name(), "checked": checked }))
    }

    /// Two-phase dropdown selection: open the trigger, wait for the options
    /// surface to settle, then click the option matching `value` by exact
    /// text, contained text, or value attribute. A missing option closes
    /// the surface again and reports a soft error.
    pub async fn select_from_dropdown(
        &self,
        target: impl Into<ActionTarget>,
        value: &str,
    ) -> ActionResult {
        let trigger = match self.prepare(target.into(), HighlightKind::Action).await {
            Ok(element) => element,
            Err(result) => return result,
        };

        if let Err(e) = self.surface.click(trigger.node).await {
            return ActionResult::fail(format!(
                "Could not open {}: {e}",
                trigger.display_name()
            ));
        }
        self.sleep_ms(self.resolver.config().dropdown_settle_ms).await;

        let wanted = value.to_lowercase();
        let options: Vec<NodeSnapshot> = self
            .surface
            .interactive_nodes()
            .await
            .into_iter()
            .filter(|n| n.kind == NodeKind::Option && n.owner == Some(trigger.node))
            .collect();

        let chosen = options
            .iter()
            .find(|o| o.text.to_lowercase() == wanted)
            .or_else(|| options.iter().find(|o| o.text.to_lowercase().contains(&wanted)))
            .or_else(|| options.iter().find(|o| o.value.to_lowercase() == wanted));

        match chosen {
            Some(option) => match self.surface.click(option.id).await {
                Ok(()) => ActionResult::ok_with(json!({
                    "selected": option.text,
                    "value": option.value,
                    "from": trigger.display_name(),
                })),
                Err(e) => ActionResult::fail(format!("Could not pick option: {e}")),
            },
            None => {
                // Close the surface before reporting, so the page is back
                // where the user left it.
                let _ = self.surface.click(trigger.node).await;
                ActionResult::fail(format!(
                    "Option '{value}' not found in {}",
                    trigger.display_name()
                ))
            }
        }
    }

    /// Scroll the page a step (or to an edge) and wait for it to settle.
    pub async fn scroll_page(&self, direction: ScrollDirection) -> ActionResult {
        let viewport = self.surface.viewport();
        let step = viewport.height * 0.8;
        let target = match direction {
            ScrollDirection::Down => viewport.scroll_y + step,
            ScrollDirection::Up => viewport.scroll_y - step,
            ScrollDirection::Top => 0.0,
            ScrollDirection::Bottom => viewport.page_height,
        };
        self.scroll_to_position(viewport.clamp_scroll(target)).await
    }

    /// Scroll to a clamped absolute offset.
    pub async fn scroll_to_position(&self, y: f64) -> ActionResult {
        if let Err(e) = self.surface.scroll_to(y).await {
            return ActionResult::fail(format!("Scroll failed: {e}"));
        }
        self.sleep_ms(self.resolver.config().scroll_settle_ms).await;
        ActionResult::ok_with(json!({ "position": self.surface.viewport().scroll_y }))
    }

    /// Move focus forward/backward through the visible, enabled focusable
    /// set, cyclically.
    pub async fn tab_navigate(&self, backward: bool) -> ActionResult {
        let mut focusable: Vec<NodeSnapshot> = self
            .surface
            .interactive_nodes()
            .await
            .into_iter()
            .filter(|n| n.kind.focusable() && n.interactable())
            .collect();
        if focusable.is_empty() {
            return ActionResult::fail("No focusable elements on the page");
        }
        focusable.sort_by(|a, b| {
            (a.rect.y, a.rect.x)
                .partial_cmp(&(b.rect.y, b.rect.x))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let current = self.surface.focused().await;
        let position = current.and_then(|id| focusable.iter().position(|n| n.id == id));
        let next_index = match (position, backward) {
            (Some(i), false) => (i + 1) % focusable.len(),
            (Some(i), true) => (i + focusable.len() - 1) % focusable.len(),
            (None, false) => 0,
            (None, true) => focusable.len() - 1,
        };
        let next = &focusable[next_index];

        if let Err(e) = self.surface.focus(next.id).await {
            return ActionResult::fail(format!("Could not move focus: {e}"));
        }
        self.apply_highlight(next.id, HighlightKind::Focus);
        ActionResult::ok_with(json!({ "focused": next.text, "index": next_index }))
    }

    /// Read an element's text back for the caller to speak or display.
    pub async fn read_element(&self, target: impl Into<ActionTarget>) -> ActionResult {
        let element = match self.resolve_target(target.into()).await {
            Ok(element) => element,
            Err(result) => return result,
        };
        ActionResult::ok_with(json!({
            "name": element.display_name(),
            "text": element.text,
            "label": element.label,
            "disabled": element.disabled,
        }))
    }

    /// Navigate session history.
    pub async fn history_navigate(&self, direction: HistoryDirection) -> ActionResult {
        let outcome = match direction {
            HistoryDirection::Back => self.surface.history_back().await,
            HistoryDirection::Forward => self.surface.history_forward().await,
        };
        match outcome {
            Ok(()) => ActionResult::ok_with(json!({ "path": self.surface.current_path() })),
            Err(e) => ActionResult::fail(format!("Cannot navigate: {e}")),
        }
    }

    // -----------------------------------------------------------------------
    // Shared plumbing
    // -----------------------------------------------------------------------

    /// Resolve, gate on disabled, bring into view, and highlight.
    async fn prepare(
        &self,
        target: ActionTarget,
        highlight: HighlightKind,
    ) -> Result<ElementDescriptor, ActionResult> {
        let element = self.resolve_target(target).await?;

        if element.disabled {
            return Err(ActionResult::fail(format!(
                "{} is disabled",
                element.display_name()
            )));
        }

        if !element.in_viewport {
            if let Err(e) = self.surface.scroll_into_view(element.node).await {
                warn!(element = %element.display_name(), error = %e, "scroll into view failed");
            } else {
                self.sleep_ms(self.resolver.config().settle_ms).await;
            }
        }

        self.apply_highlight(element.node, highlight);
        Ok(element)
    }

    async fn resolve_target(
        &self,
        target: ActionTarget,
    ) -> Result<ElementDescriptor, ActionResult> {
        match target {
            ActionTarget::Descriptor(descriptor) => Ok(descriptor),
            ActionTarget::Node(id) => {
                let index =
                    ElementIndex::build(self.surface.as_ref(), IndexOptions { include_hidden: true })
                        .await;
                index
                    .by_node(id)
                    .cloned()
                    .ok_or_else(|| ActionResult::fail(format!("Element not found: {id}")))
            }
            ActionTarget::Query(query) => self
                .resolve_query(&query)
                .await
                .ok_or_else(|| ActionResult::fail(format!("Element not found: {query}"))),
            ActionTarget::Focused => {
                let focused = self.surface.focused().await;
                match focused {
                    Some(id) => {
                        let index = ElementIndex::build(
                            self.surface.as_ref(),
                            IndexOptions { include_hidden: true },
                        )
                        .await;
                        index.by_node(id).cloned().ok_or_else(|| {
                            ActionResult::fail("The focused element is gone")
                        })
                    }
                    None => Err(ActionResult::fail("No element is focused")),
                }
            }
        }
    }

    /// Apply a highlight that reverts itself after the configured delay.
    fn apply_highlight(&self, node: NodeId, kind: HighlightKind) {
        let surface = Arc::clone(&self.surface);
        let hold = Duration::from_millis(self.resolver.config().highlight_ms);
        tokio::spawn(async move {
            if surface.set_highlight(node, Some(kind)).await.is_ok() {
                tokio::time::sleep(hold).await;
                let _ = surface.set_highlight(node, None).await;
            }
        });
    }

    /// Character-by-character fill. Purely cosmetic; the jitter is a cheap
    /// hash of the position, not real randomness.
    async fn type_characters(
        &self,
        node: NodeId,
        value: &str,
    ) -> compass_surface::Result<()> {
        let config = self.resolver.config();
        let mut partial = String::with_capacity(value.len());
        for (i, ch) in value.chars().enumerate() {
            partial.push(ch);
            self.surface.set_value(node, &partial).await?;
            let jitter = if config.type_jitter_ms > 0 {
                ((i as u64).wrapping_mul(31) ^ value.len() as u64) % config.type_jitter_ms
            } else {
                0
            };
            tokio::time::sleep(Duration::from_millis(config.type_char_ms + jitter)).await;
        }
        Ok(())
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use compass_surface::{MockSurface, NodeSpec, SurfaceEvent};

    fn fast_config() -> EngineConfig {
        EngineConfig {
            highlight_ms: 1,
            settle_ms: 1,
            dropdown_settle_ms: 1,
            scroll_settle_ms: 1,
            type_char_ms: 0,
            type_jitter_ms: 0,
            poll_interval_ms: 5,
            wait_timeout_ms: 100,
            ..EngineConfig::default()
        }
    }

    fn executor(surface: Arc<MockSurface>) -> ActionExecutor {
        ActionExecutor::new(surface, Arc::new(Resolver::new(fast_config())))
    }

    #[tokio::test]
    async fn click_by_query_resolves_and_clicks() {
        let surface = Arc::new(MockSurface::new("/auth"));
        let id = surface.add(NodeSpec::button("Sign Up").action_id("signup-tab"));
        let exec = executor(surface.clone());

        let result = exec.click_element("sign up").await;
        assert!(result.success, "{:?}", result.error);
        assert!(surface.events().contains(&SurfaceEvent::Clicked(id)));
    }

    #[tokio::test]
    async fn click_unresolvable_is_soft_error() {
        let surface = Arc::new(MockSurface::new("/"));
        let exec = executor(surface);
        let result = exec.click_element("nonexistent widget").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Element not found"));
    }

    #[tokio::test]
    async fn click_disabled_is_soft_error() {
        let surface = Arc::new(MockSurface::new("/"));
        surface.add(NodeSpec::button("Submit").action_id("signup-submit").disabled());
        let exec = executor(surface);
        let result = exec.click_element("signup-submit").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("disabled"));
    }

    #[tokio::test]
    async fn fill_sets_value_and_dispatches_change() {
        let surface = Arc::new(MockSurface::new("/auth"));
        let id = surface.add(
            NodeSpec::text_input("email")
                .action_id("signup-email")
                .label("Email address"),
        );
        let exec = executor(surface.clone());

        let result = exec.fill_input("signup-email", "a@b.com", false).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(surface.node(id).await.unwrap().value, "a@b.com");
        assert!(surface
            .events()
            .contains(&SurfaceEvent::ChangeDispatched(id)));
    }

    #[tokio::test]
    async fn simulated_typing_lands_on_full_value() {
        let surface = Arc::new(MockSurface::new("/auth"));
        let id = surface.add(NodeSpec::text_input("name").action_id("signup-name"));
        let exec = executor(surface.clone());

        let result = exec.fill_input("signup-name", "Ada", true).await;
        assert!(result.success);
        assert_eq!(surface.node(id).await.unwrap().value, "Ada");
    }

    #[tokio::test]
    async fn fill_focused_without_focus_fails_softly() {
        let surface = Arc::new(MockSurface::new("/"));
        surface.add(NodeSpec::text_input("email"));
        let exec = executor(surface);
        let result = exec.fill_input(ActionTarget::Focused, "hello", false).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("No element is focused"));
    }

    #[tokio::test]
    async fn select_picks_matching_option() {
        let surface = Arc::new(MockSurface::new("/auth"));
        let select = surface.add(
            NodeSpec::select(
                "role",
                vec![("student", "Student"), ("counsellor", "Counsellor")],
            )
            .action_id("role-select"),
        );
        let exec = executor(surface.clone());

        let result = exec.select_from_dropdown("role-select", "counsellor").await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(surface.node(select).await.unwrap().value, "counsellor");
    }

    #[tokio::test]
    async fn select_missing_option_closes_and_reports() {
        let surface = Arc::new(MockSurface::new("/auth"));
        surface.add(
            NodeSpec::select("role", vec![("student", "Student")]).action_id("role-select"),
        );
        let exec = executor(surface.clone());

        let result = exec.select_from_dropdown("role-select", "astronaut").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("astronaut"));
        // Dropdown is closed again.
        assert!(
            !surface
                .interactive_nodes()
                .await
                .iter()
                .any(|n| n.kind == NodeKind::Option)
        );
    }

    #[tokio::test]
    async fn toggle_reports_new_state() {
        let surface = Arc::new(MockSurface::new("/"));
        surface.add(NodeSpec::checkbox("remember").action_id("remember-me"));
        let exec = executor(surface);

        let result = exec.toggle_element("remember-me").await;
        assert!(result.success);
        assert_eq!(result.data.unwrap()["checked"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn scroll_page_down_moves_viewport() {
        let surface = Arc::new(MockSurface::new("/"));
        surface.add(NodeSpec::button("Footer").at(0.0, 2400.0));
        let exec = executor(surface.clone());

        let result = exec.scroll_page(ScrollDirection::Down).await;
        assert!(result.success);
        assert!(surface.viewport().scroll_y > 0.0);

        let result = exec.scroll_page(ScrollDirection::Top).await;
        assert!(result.success);
        assert_eq!(surface.viewport().scroll_y, 0.0);
    }

    #[tokio::test]
    async fn out_of_viewport_target_is_scrolled_into_view() {
        let surface = Arc::new(MockSurface::new("/"));
        let far = surface.add(NodeSpec::button("Far away").action_id("far-button").at(0.0, 2400.0));
        let exec = executor(surface.clone());

        let result = exec.click_element("far-button").await;
        assert!(result.success, "{:?}", result.error);
        assert!(surface.events().contains(&SurfaceEvent::ScrolledIntoView(far)));
    }

    #[tokio::test]
    async fn tab_navigate_cycles_forward_and_backward() {
        let surface = Arc::new(MockSurface::new("/"));
        let first = surface.add(NodeSpec::text_input("a").at(0.0, 10.0));
        let second = surface.add(NodeSpec::text_input("b").at(0.0, 60.0));
        let exec = executor(surface.clone());

        assert!(exec.tab_navigate(false).await.success);
        assert_eq!(surface.focused().await, Some(first));
        assert!(exec.tab_navigate(false).await.success);
        assert_eq!(surface.focused().await, Some(second));
        // Wraps around.
        assert!(exec.tab_navigate(false).await.success);
        assert_eq!(surface.focused().await, Some(first));
        assert!(exec.tab_navigate(true).await.success);
        assert_eq!(surface.focused().await, Some(second));
    }

    #[tokio::test]
    async fn history_navigate_reports_soft_error_at_bound() {
        let surface = Arc::new(MockSurface::new("/dashboard"));
        let exec = executor(surface);
        let result = exec.history_navigate(HistoryDirection::Back).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Cannot navigate"));
    }

    #[tokio::test]
    async fn clear_empties_field() {
        let surface = Arc::new(MockSurface::new("/"));
        let id = surface.add(NodeSpec::text_input("email").action_id("signup-email"));
        surface.set_value(id, "typo@b.com").await.unwrap();
        let exec = executor(surface.clone());

        let result = exec.clear_input("signup-email").await;
        assert!(result.success);
        assert_eq!(surface.node(id).await.unwrap().value, "");
    }
}
