use tracing::error;

use crate::error::AgentError;
use crate::layout::model::{ComponentCatalog, ProposedUiState, UiState};
use crate::layout::parser::excerpt;
use crate::layout::validator::{complete_component, validate_state, FieldError};

const MERGED_EXCERPT_CHARS: usize = 1000;

/// Overlays the model's proposal on the caller's state.
///
/// Mentioned components keep every prior field the proposal leaves unset;
/// components the proposal does not mention are appended unchanged in their
/// prior order. The merged state is validated as a whole before it is
/// returned, so an unsafe result is an error, never a corrected state.
pub fn reconcile(
    current: &UiState,
    updated: Option<&ProposedUiState>,
    catalog: &ComponentCatalog,
) -> Result<UiState, AgentError> {
    let Some(updated) = updated else {
        return Ok(current.clone());
    };

    let mut components = Vec::with_capacity(current.components.len().max(updated.components.len()));
    for (index, patch) in updated.components.iter().enumerate() {
        let merged = match current.component(patch.id) {
            Some(prior) => prior.overlay(patch),
            None => complete_component(patch, &format!("updatedConfig.components[{index}]"), catalog)
                .map_err(|violation| violation_error(violation, None))?,
        };
        components.push(merged);
    }

    for prior in &current.components {
        if !updated.components.iter().any(|patch| patch.id == prior.id) {
            components.push(prior.clone());
        }
    }

    let merged = UiState {
        theme: updated.theme.unwrap_or(current.theme),
        components,
    };
    validate_state(&merged, "mergedState", catalog).map_err(|violation| violation_error(violation, Some(&merged)))?;
    Ok(merged)
}

fn violation_error(violation: FieldError, merged: Option<&UiState>) -> AgentError {
    let snippet = merged
        .and_then(|state| serde_json::to_string(state).ok())
        .map(|json| excerpt(&json, MERGED_EXCERPT_CHARS))
        .unwrap_or_default();
    error!("reconciled state rejected: {violation}");
    AgentError::SchemaViolation {
        violation,
        excerpt: snippet,
    }
}
