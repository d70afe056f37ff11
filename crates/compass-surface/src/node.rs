//! Node snapshot types.
//!
//! A [`NodeSnapshot`] is a point-in-time copy of one page control, read
//! through [`crate::UiSurface`]. The engine builds its element index from
//! snapshots and refers back to the live node only by [`NodeId`] — it never
//! owns UI nodes.

use serde::{Deserialize, Serialize};

/// Opaque, non-owning handle to a node on the UI surface.
///
/// Ids are stable for the lifetime of the node but may be reused after the
/// node is removed; the engine rebuilds its index every turn, so stale ids
/// surface as `NodeNotFound` rather than misdirected interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The broad category of a page control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Button,
    Link,
    TextInput,
    Textarea,
    Select,
    /// A rendered option inside an open dropdown surface.
    Option,
    Checkbox,
    Radio,
    Toggle,
    /// A non-control element carrying an explicit action tag.
    TaggedAction,
    Other,
}

impl NodeKind {
    /// Whether this kind of node participates in keyboard tab order.
    pub fn focusable(self) -> bool {
        !matches!(self, NodeKind::Option | NodeKind::Other)
    }

    /// Whether this kind of node accepts text input.
    pub fn editable(self) -> bool {
        matches!(self, NodeKind::TextInput | NodeKind::Textarea)
    }
}

/// Axis-aligned bounding box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rect with no area (hidden or unrendered nodes report this).
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// The visible window over the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Current vertical scroll offset.
    pub scroll_y: f64,
    /// Total scrollable page height.
    pub page_height: f64,
}

impl Viewport {
    /// Whether any part of `rect` is inside the visible window.
    pub fn contains(&self, rect: &Rect) -> bool {
        !rect.is_empty()
            && rect.y < self.scroll_y + self.height
            && rect.y + rect.height > self.scroll_y
    }

    /// Clamp a target scroll offset to the scrollable range.
    pub fn clamp_scroll(&self, y: f64) -> f64 {
        y.max(0.0).min((self.page_height - self.height).max(0.0))
    }
}

/// One choice inside a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// Point-in-time copy of one page control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    /// The `type` attribute for inputs (e.g. "email", "password").
    pub input_type: Option<String>,
    /// Explicit action tag (e.g. `data-action="signup-submit"`).
    pub action_id: Option<String>,
    /// The element's own id attribute.
    pub dom_id: Option<String>,
    /// The `name` attribute.
    pub name: Option<String>,
    /// Visible inner text.
    pub text: String,
    /// Current value for inputs/selects.
    pub value: String,
    pub placeholder: Option<String>,
    pub aria_label: Option<String>,
    pub title: Option<String>,
    /// Text of an associated `<label>`, if any.
    pub label: Option<String>,
    /// Explicit ARIA role, if any.
    pub role: Option<String>,
    pub disabled: bool,
    /// Hidden via styling (display:none, visibility:hidden).
    pub hidden: bool,
    pub aria_hidden: bool,
    /// Checked state for checkboxes/radios/toggles.
    pub checked: Option<bool>,
    pub rect: Rect,
    /// For `Option` nodes, the dropdown that owns them.
    pub owner: Option<NodeId>,
    /// Declared options of a closed dropdown (native `<select>`).
    pub options: Vec<SelectOption>,
}

impl NodeSnapshot {
    /// A minimal snapshot; callers fill in what they need.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            input_type: None,
            action_id: None,
            dom_id: None,
            name: None,
            text: String::new(),
            value: String::new(),
            placeholder: None,
            aria_label: None,
            title: None,
            label: None,
            role: None,
            disabled: false,
            hidden: false,
            aria_hidden: false,
            checked: None,
            rect: Rect::default(),
            owner: None,
            options: Vec::new(),
        }
    }

    /// Whether the node can currently be interacted with at all.
    pub fn interactable(&self) -> bool {
        !self.disabled && !self.hidden && !self.aria_hidden && !self.rect.is_empty()
    }
}
