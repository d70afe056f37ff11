//! UI surface abstraction for Compass Assist.
//!
//! The command engine never touches a real DOM. Everything it needs from the
//! page — enumerating interactive controls, reading geometry and state,
//! clicking, filling, scrolling, focus and history — goes through the
//! [`UiSurface`] trait. The browser side of the application implements the
//! trait over the live document; tests and the demo REPL use [`MockSurface`].

pub mod error;
pub mod mock;
pub mod node;
pub mod surface;

pub use error::{Result, SurfaceError};
pub use mock::{MockSurface, NodeSpec};
pub use node::{NodeId, NodeKind, NodeSnapshot, Rect, SelectOption, Viewport};
pub use surface::{HighlightKind, ScrollDirection, SurfaceEvent, UiSurface};
