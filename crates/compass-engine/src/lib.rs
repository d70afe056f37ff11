//! Command interpretation and execution engine for Compass Assist.
//!
//! The engine turns natural-language commands ("click sign up", "my email
//! is ada@example.com") into concrete interactions against a
//! [`compass_surface::UiSurface`]. The pipeline, per utterance:
//!
//! - [`parser::CommandParser`] classifies text into an [`intent::Intent`]
//!   with a fixed, ordered rule table;
//! - [`element::Resolver`] maps free-text targets onto page controls
//!   through a five-tier cascade;
//! - [`executor::ActionExecutor`] performs the primitive interaction with
//!   visual feedback and soft errors;
//! - [`workflow::WorkflowEngine`] drives multi-step flows (sign-up,
//!   sign-in, verification) that pause for missing data;
//! - [`orchestrator::Orchestrator`] wires the above together, gates on
//!   parse confidence, and falls back to a remote
//!   [`compass_classifier::Classifier`] under a hard time bound.
//!
//! Failures a user can fix ("element not found", "that field is disabled")
//! travel as [`executor::ActionResult`] values, not errors; [`EngineError`]
//! is reserved for real faults such as invalid patterns or configuration.

pub mod config;
pub mod element;
pub mod error;
pub mod executor;
pub mod intent;
pub mod orchestrator;
pub mod parser;
pub mod workflow;

pub use config::EngineConfig;
pub use element::{ElementDescriptor, ElementIndex, IndexOptions, Resolver};
pub use error::{EngineError, Result};
pub use executor::{ActionExecutor, ActionResult, ActionTarget};
pub use intent::{AuthMode, HistoryDirection, Intent, ParsedIntent, ScrollDirection};
pub use orchestrator::{DecisionRecord, DecisionSource, EngineReply, Orchestrator};
pub use parser::CommandParser;
pub use workflow::{
    Step, StepCondition, StepKind, StepOutcome, WorkflowEngine, WorkflowStatus, WorkflowTemplate,
};
