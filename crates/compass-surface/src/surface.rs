//! The `UiSurface` capability trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node::{NodeId, NodeSnapshot, Viewport};

/// Semantic color key for the transient interaction highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    /// A control about to be activated (click, toggle).
    Action,
    /// A field about to receive text.
    Fill,
    /// An operation that just succeeded.
    Success,
    /// An operation that just failed.
    Error,
    /// A control receiving keyboard focus.
    Focus,
}

/// Direction for page scrolling and tab navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Top,
    Bottom,
}

/// One observed interaction, recorded by surfaces that support journaling.
///
/// The engine never reads these; they exist so tests can assert on the exact
/// sequence of native interactions a command produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    Clicked(NodeId),
    Focused(NodeId),
    ValueSet(NodeId, String),
    ChangeDispatched(NodeId),
    HighlightSet(NodeId, HighlightKind),
    HighlightCleared(NodeId),
    ScrolledTo(f64),
    ScrolledIntoView(NodeId),
    HistoryBack,
    HistoryForward,
}

/// Narrow capability interface between the command engine and the page.
///
/// Implementations must be cheap to query: the engine rebuilds its element
/// index from [`UiSurface::interactive_nodes`] on every utterance.
#[async_trait]
pub trait UiSurface: Send + Sync {
    /// The current route/path, for page context and history decisions.
    fn current_path(&self) -> String;

    /// The visible window and scroll extent.
    fn viewport(&self) -> Viewport;

    /// Snapshot every candidate interactive node on the page, including
    /// hidden and disabled ones — filtering is the caller's concern.
    async fn interactive_nodes(&self) -> Vec<NodeSnapshot>;

    /// Re-read a single node by id.
    async fn node(&self, id: NodeId) -> Option<NodeSnapshot>;

    /// The node that currently holds keyboard focus, if any.
    async fn focused(&self) -> Option<NodeId>;

    /// Perform a native click on the node.
    async fn click(&self, id: NodeId) -> Result<()>;

    /// Move keyboard focus to the node.
    async fn focus(&self, id: NodeId) -> Result<()>;

    /// Replace the node's value. Does not dispatch change notifications;
    /// call [`UiSurface::dispatch_change`] afterwards so reactive UI layers
    /// observe the edit.
    async fn set_value(&self, id: NodeId, value: &str) -> Result<()>;

    /// Dispatch synthetic input/change notifications for the node.
    async fn dispatch_change(&self, id: NodeId) -> Result<()>;

    /// Apply or clear the transient visual highlight on the node.
    async fn set_highlight(&self, id: NodeId, kind: Option<HighlightKind>) -> Result<()>;

    /// Scroll the node into the visible window.
    async fn scroll_into_view(&self, id: NodeId) -> Result<()>;

    /// Scroll the page to an absolute vertical offset (clamped by the
    /// implementation).
    async fn scroll_to(&self, y: f64) -> Result<()>;

    /// Navigate one entry back in session history.
    async fn history_back(&self) -> Result<()>;

    /// Navigate one entry forward in session history.
    async fn history_forward(&self) -> Result<()>;
}
