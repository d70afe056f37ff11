//! In-memory mock surface.
//!
//! [`MockSurface`] models just enough of a page for the engine to run
//! without a browser: an ordered node list, a viewport with scroll state, a
//! focus slot, session history, and native dropdown/checkbox behavior. Every
//! interaction is journaled as a [`SurfaceEvent`] so tests can assert on the
//! exact sequence a command produced.
//!
//! Click hooks let a test script page reactions — a submit button revealing
//! an OTP card, a mode switch swapping forms — which is how dynamic content
//! for `wait_for_element` is exercised.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, SurfaceError};
use crate::node::{NodeId, NodeKind, NodeSnapshot, Rect, SelectOption, Viewport};
use crate::surface::{HighlightKind, SurfaceEvent, UiSurface};

/// Reaction to run against the page when a node is clicked.
type ClickHook = Box<dyn Fn(&mut PageModel) + Send + Sync>;

/// The mutable page state behind the mock.
pub struct PageModel {
    pub nodes: Vec<NodeSnapshot>,
    pub viewport: Viewport,
    pub focused: Option<NodeId>,
    history: Vec<String>,
    history_index: usize,
    next_id: u64,
}

impl PageModel {
    fn new(path: &str) -> Self {
        Self {
            nodes: Vec::new(),
            viewport: Viewport {
                width: 1280.0,
                height: 800.0,
                scroll_y: 0.0,
                page_height: 800.0,
            },
            focused: None,
            history: vec![path.to_string()],
            history_index: 0,
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeSnapshot> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Insert a node from a spec and grow the page to fit it.
    pub fn insert(&mut self, spec: NodeSpec) -> NodeId {
        let id = self.alloc_id();
        let node = spec.into_snapshot(id);
        let bottom = node.rect.y + node.rect.height;
        if bottom > self.viewport.page_height {
            self.viewport.page_height = bottom;
        }
        self.nodes.push(node);
        id
    }

    /// Remove a node (and any open dropdown options it owns).
    pub fn remove(&mut self, id: NodeId) {
        self.nodes.retain(|n| n.id != id && n.owner != Some(id));
        if self.focused == Some(id) {
            self.focused = None;
        }
    }

    /// Reveal or hide a node in place.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        if let Some(node) = self.node_mut(id) {
            node.hidden = hidden;
        }
    }

    /// Enable or disable a node in place.
    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        if let Some(node) = self.node_mut(id) {
            node.disabled = disabled;
        }
    }

    /// Push a new history entry, truncating any forward entries.
    pub fn navigate(&mut self, path: impl Into<String>) {
        self.history.truncate(self.history_index + 1);
        self.history.push(path.into());
        self.history_index = self.history.len() - 1;
    }

    /// Materialize an open dropdown's options as clickable nodes.
    fn open_dropdown(&mut self, id: NodeId) {
        let Some(select) = self.node(id).cloned() else {
            return;
        };
        let mut y = select.rect.y + select.rect.height;
        for option in &select.options {
            let option_id = self.alloc_id();
            let mut node = NodeSnapshot::new(option_id, NodeKind::Option);
            node.text = option.text.clone();
            node.value = option.value.clone();
            node.owner = Some(id);
            node.rect = Rect::new(select.rect.x, y, select.rect.width, 28.0);
            y += 28.0;
            self.nodes.push(node);
        }
    }

    /// Remove any rendered option nodes belonging to the dropdown.
    fn close_dropdown(&mut self, id: NodeId) {
        self.nodes.retain(|n| n.owner != Some(id));
    }

    fn dropdown_is_open(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.owner == Some(id))
    }
}

/// Builder for seeding nodes into a [`MockSurface`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    snapshot: NodeSnapshot,
}

impl NodeSpec {
    pub fn new(kind: NodeKind) -> Self {
        let mut snapshot = NodeSnapshot::new(NodeId(0), kind);
        snapshot.rect = Rect::new(0.0, 0.0, 200.0, 36.0);
        Self { snapshot }
    }

    pub fn button(text: &str) -> Self {
        let mut spec = Self::new(NodeKind::Button);
        spec.snapshot.text = text.to_string();
        spec
    }

    pub fn link(text: &str) -> Self {
        let mut spec = Self::new(NodeKind::Link);
        spec.snapshot.text = text.to_string();
        spec
    }

    pub fn text_input(name: &str) -> Self {
        let mut spec = Self::new(NodeKind::TextInput);
        spec.snapshot.name = Some(name.to_string());
        spec
    }

    pub fn select(name: &str, options: Vec<(&str, &str)>) -> Self {
        let mut spec = Self::new(NodeKind::Select);
        spec.snapshot.name = Some(name.to_string());
        spec.snapshot.options = options
            .into_iter()
            .map(|(value, text)| SelectOption {
                value: value.to_string(),
                text: text.to_string(),
            })
            .collect();
        spec
    }

    pub fn checkbox(name: &str) -> Self {
        let mut spec = Self::new(NodeKind::Checkbox);
        spec.snapshot.name = Some(name.to_string());
        spec.snapshot.checked = Some(false);
        spec
    }

    pub fn action_id(mut self, id: &str) -> Self {
        self.snapshot.action_id = Some(id.to_string());
        self
    }

    pub fn dom_id(mut self, id: &str) -> Self {
        self.snapshot.dom_id = Some(id.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.snapshot.text = text.to_string();
        self
    }

    pub fn placeholder(mut self, text: &str) -> Self {
        self.snapshot.placeholder = Some(text.to_string());
        self
    }

    pub fn label(mut self, text: &str) -> Self {
        self.snapshot.label = Some(text.to_string());
        self
    }

    pub fn aria_label(mut self, text: &str) -> Self {
        self.snapshot.aria_label = Some(text.to_string());
        self
    }

    pub fn input_type(mut self, ty: &str) -> Self {
        self.snapshot.input_type = Some(ty.to_string());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.snapshot.rect.x = x;
        self.snapshot.rect.y = y;
        self
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.snapshot.rect.width = width;
        self.snapshot.rect.height = height;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.snapshot.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.snapshot.disabled = true;
        self
    }

    fn into_snapshot(self, id: NodeId) -> NodeSnapshot {
        let mut snapshot = self.snapshot;
        snapshot.id = id;
        snapshot
    }
}

/// Scripted in-memory [`UiSurface`] implementation.
pub struct MockSurface {
    state: Mutex<PageModel>,
    hooks: Mutex<HashMap<NodeId, ClickHook>>,
    events: Mutex<Vec<SurfaceEvent>>,
}

impl MockSurface {
    pub fn new(path: &str) -> Self {
        Self {
            state: Mutex::new(PageModel::new(path)),
            hooks: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Seed a node and return its id.
    pub fn add(&self, spec: NodeSpec) -> NodeId {
        self.state.lock().expect("surface lock").insert(spec)
    }

    /// Run arbitrary edits against the page model.
    pub fn with_page<R>(&self, f: impl FnOnce(&mut PageModel) -> R) -> R {
        f(&mut self.state.lock().expect("surface lock"))
    }

    /// Script a page reaction for when `id` is clicked (runs after the
    /// default click behavior).
    pub fn on_click(&self, id: NodeId, hook: impl Fn(&mut PageModel) + Send + Sync + 'static) {
        self.hooks
            .lock()
            .expect("surface lock")
            .insert(id, Box::new(hook));
    }

    /// The journal of interactions performed so far.
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().expect("surface lock").clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().expect("surface lock").clear();
    }

    fn record(&self, event: SurfaceEvent) {
        self.events.lock().expect("surface lock").push(event);
    }

    fn require_node(&self, id: NodeId) -> Result<NodeSnapshot> {
        self.state
            .lock()
            .expect("surface lock")
            .node(id)
            .cloned()
            .ok_or(SurfaceError::NodeNotFound { id })
    }
}

#[async_trait]
impl UiSurface for MockSurface {
    fn current_path(&self) -> String {
        let state = self.state.lock().expect("surface lock");
        state.history[state.history_index].clone()
    }

    fn viewport(&self) -> Viewport {
        self.state.lock().expect("surface lock").viewport
    }

    async fn interactive_nodes(&self) -> Vec<NodeSnapshot> {
        self.state.lock().expect("surface lock").nodes.clone()
    }

    async fn node(&self, id: NodeId) -> Option<NodeSnapshot> {
        self.state.lock().expect("surface lock").node(id).cloned()
    }

    async fn focused(&self) -> Option<NodeId> {
        self.state.lock().expect("surface lock").focused
    }

    async fn click(&self, id: NodeId) -> Result<()> {
        let node = self.require_node(id)?;
        if node.disabled {
            return Err(SurfaceError::NotInteractable {
                id,
                reason: "disabled".into(),
            });
        }

        debug!(node = %id, kind = ?node.kind, "mock click");

        {
            let mut state = self.state.lock().expect("surface lock");
            match node.kind {
                NodeKind::Checkbox | NodeKind::Radio | NodeKind::Toggle => {
                    if let Some(n) = state.node_mut(id) {
                        n.checked = Some(!n.checked.unwrap_or(false));
                    }
                }
                NodeKind::Select => {
                    if state.dropdown_is_open(id) {
                        state.close_dropdown(id);
                    } else {
                        state.open_dropdown(id);
                    }
                }
                NodeKind::Option => {
                    if let Some(owner) = node.owner {
                        if let Some(select) = state.node_mut(owner) {
                            select.value = node.value.clone();
                        }
                        state.close_dropdown(owner);
                    }
                }
                _ => {}
            }
        }

        if let Some(hook) = self.hooks.lock().expect("surface lock").get(&id) {
            hook(&mut self.state.lock().expect("surface lock"));
        }

        self.record(SurfaceEvent::Clicked(id));
        Ok(())
    }

    async fn focus(&self, id: NodeId) -> Result<()> {
        self.require_node(id)?;
        self.state.lock().expect("surface lock").focused = Some(id);
        self.record(SurfaceEvent::Focused(id));
        Ok(())
    }

    async fn set_value(&self, id: NodeId, value: &str) -> Result<()> {
        let mut state = self.state.lock().expect("surface lock");
        let node = state
            .node_mut(id)
            .ok_or(SurfaceError::NodeNotFound { id })?;
        node.value = value.to_string();
        drop(state);
        self.record(SurfaceEvent::ValueSet(id, value.to_string()));
        Ok(())
    }

    async fn dispatch_change(&self, id: NodeId) -> Result<()> {
        self.require_node(id)?;
        self.record(SurfaceEvent::ChangeDispatched(id));
        Ok(())
    }

    async fn set_highlight(&self, id: NodeId, kind: Option<HighlightKind>) -> Result<()> {
        self.require_node(id)?;
        match kind {
            Some(kind) => self.record(SurfaceEvent::HighlightSet(id, kind)),
            None => self.record(SurfaceEvent::HighlightCleared(id)),
        }
        Ok(())
    }

    async fn scroll_into_view(&self, id: NodeId) -> Result<()> {
        let node = self.require_node(id)?;
        let mut state = self.state.lock().expect("surface lock");
        // Place the node a third of the way down the window.
        let target = node.rect.y - state.viewport.height / 3.0;
        state.viewport.scroll_y = state.viewport.clamp_scroll(target);
        drop(state);
        self.record(SurfaceEvent::ScrolledIntoView(id));
        Ok(())
    }

    async fn scroll_to(&self, y: f64) -> Result<()> {
        let mut state = self.state.lock().expect("surface lock");
        state.viewport.scroll_y = state.viewport.clamp_scroll(y);
        let landed = state.viewport.scroll_y;
        drop(state);
        self.record(SurfaceEvent::ScrolledTo(landed));
        Ok(())
    }

    async fn history_back(&self) -> Result<()> {
        let mut state = self.state.lock().expect("surface lock");
        if state.history_index == 0 {
            return Err(SurfaceError::NoHistoryEntry { direction: "back" });
        }
        state.history_index -= 1;
        drop(state);
        self.record(SurfaceEvent::HistoryBack);
        Ok(())
    }

    async fn history_forward(&self) -> Result<()> {
        let mut state = self.state.lock().expect("surface lock");
        if state.history_index + 1 >= state.history.len() {
            return Err(SurfaceError::NoHistoryEntry {
                direction: "forward",
            });
        }
        state.history_index += 1;
        drop(state);
        self.record(SurfaceEvent::HistoryForward);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn click_toggles_checkbox() {
        let surface = MockSurface::new("/");
        let id = surface.add(NodeSpec::checkbox("remember"));

        surface.click(id).await.unwrap();
        assert_eq!(surface.node(id).await.unwrap().checked, Some(true));

        surface.click(id).await.unwrap();
        assert_eq!(surface.node(id).await.unwrap().checked, Some(false));
    }

    #[tokio::test]
    async fn click_on_select_opens_and_option_click_chooses() {
        let surface = MockSurface::new("/");
        let select = surface.add(NodeSpec::select(
            "role",
            vec![("student", "Student"), ("counsellor", "Counsellor")],
        ));

        // No option nodes until the trigger is clicked.
        assert_eq!(surface.interactive_nodes().await.len(), 1);

        surface.click(select).await.unwrap();
        let nodes = surface.interactive_nodes().await;
        let options: Vec<_> = nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Option)
            .collect();
        assert_eq!(options.len(), 2);

        let counsellor = options
            .iter()
            .find(|n| n.text == "Counsellor")
            .expect("rendered option");
        surface.click(counsellor.id).await.unwrap();

        // Option chosen, dropdown closed.
        assert_eq!(surface.node(select).await.unwrap().value, "counsellor");
        assert_eq!(surface.interactive_nodes().await.len(), 1);
    }

    #[tokio::test]
    async fn click_hook_reveals_scripted_content() {
        let surface = MockSurface::new("/auth");
        let submit = surface.add(NodeSpec::button("Submit").action_id("signup-submit"));
        let otp = surface.add(NodeSpec::text_input("otp").hidden());

        surface.on_click(submit, move |page| page.set_hidden(otp, false));

        assert!(surface.node(otp).await.unwrap().hidden);
        surface.click(submit).await.unwrap();
        assert!(!surface.node(otp).await.unwrap().hidden);
    }

    #[tokio::test]
    async fn disabled_node_rejects_click() {
        let surface = MockSurface::new("/");
        let id = surface.add(NodeSpec::button("Submit").disabled());
        let err = surface.click(id).await.unwrap_err();
        assert!(matches!(err, SurfaceError::NotInteractable { .. }));
    }

    #[tokio::test]
    async fn set_value_and_dispatch_are_journaled() {
        let surface = MockSurface::new("/");
        let id = surface.add(NodeSpec::text_input("email"));

        surface.set_value(id, "a@b.com").await.unwrap();
        surface.dispatch_change(id).await.unwrap();

        assert_eq!(
            surface.events(),
            vec![
                SurfaceEvent::ValueSet(id, "a@b.com".into()),
                SurfaceEvent::ChangeDispatched(id),
            ]
        );
    }

    #[tokio::test]
    async fn scroll_to_clamps_to_page_height() {
        let surface = MockSurface::new("/");
        surface.add(NodeSpec::button("Footer").at(0.0, 2360.0).sized(200.0, 40.0));

        surface.scroll_to(99_999.0).await.unwrap();
        let vp = surface.viewport();
        assert_eq!(vp.scroll_y, vp.page_height - vp.height);
    }

    #[tokio::test]
    async fn history_navigation_bounds() {
        let surface = MockSurface::new("/dashboard");
        assert!(surface.history_back().await.is_err());

        surface.with_page(|page| page.navigate("/auth"));
        assert_eq!(surface.current_path(), "/auth");

        surface.history_back().await.unwrap();
        assert_eq!(surface.current_path(), "/dashboard");

        surface.history_forward().await.unwrap();
        assert_eq!(surface.current_path(), "/auth");
        assert!(surface.history_forward().await.is_err());
    }
}
