//! Natural-language cockpit layout agent.
//!
//! A pilot command and the current display state go in; a language model
//! proposes a new layout; the proposal is extracted, validated against the
//! safety rules and merged into the state the caller gets back.

pub mod config;
pub mod error;
pub mod layout;
pub mod llm;
pub mod orchestrator;
pub mod server;
pub mod state;

pub use error::AgentError;
pub use layout::model::{AgentResult, ComponentCatalog, ComponentConfig, ComponentId, ProposedUiState, UiState};
pub use orchestrator::{AdjustOutcome, CockpitAgent};
