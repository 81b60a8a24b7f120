use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::AgentError;
use crate::layout::extract::extract_json;
use crate::layout::model::{AgentResult, ComponentCatalog, UiState};
use crate::layout::parser::parse_agent_response;
use crate::layout::validator::validate_state;
use crate::llm::prompt::{build_prompt, SYSTEM_INSTRUCTION};
use crate::llm::ModelBackend;
use crate::state::reconcile::reconcile;

pub const DEFAULT_ACCEPTED_MESSAGE: &str = "Configuration updated.";
pub const DEFAULT_REJECTED_MESSAGE: &str = "Command rejected.";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustOutcome {
    pub success: bool,
    pub message: String,
    #[serde(rename = "newState", skip_serializing_if = "Option::is_none")]
    pub new_state: Option<UiState>,
}

impl AdjustOutcome {
    fn accepted(message: Option<String>, new_state: UiState) -> Self {
        Self {
            success: true,
            message: non_blank(message).unwrap_or_else(|| DEFAULT_ACCEPTED_MESSAGE.to_string()),
            new_state: Some(new_state),
        }
    }

    fn rejected(message: Option<String>) -> Self {
        Self {
            success: false,
            message: non_blank(message).unwrap_or_else(|| DEFAULT_REJECTED_MESSAGE.to_string()),
            new_state: None,
        }
    }
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|message| !message.trim().is_empty())
}

/// Runs one command through prompt, model, extraction, validation and merge.
///
/// Holds only read-only state, so one instance serves concurrent requests.
pub struct CockpitAgent {
    backend: Option<Arc<dyn ModelBackend>>,
    instruction: String,
    catalog: ComponentCatalog,
    invoke_timeout: Duration,
}

impl CockpitAgent {
    pub fn new(backend: Option<Arc<dyn ModelBackend>>) -> Self {
        Self {
            backend,
            instruction: SYSTEM_INSTRUCTION.to_string(),
            catalog: ComponentCatalog::standard(),
            invoke_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_instruction(mut self, instruction: String) -> Self {
        self.instruction = instruction;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    pub fn backend(&self) -> Option<&Arc<dyn ModelBackend>> {
        self.backend.as_ref()
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    pub async fn call_agent(&self, command: &str, current: &UiState) -> Result<AgentResult, AgentError> {
        let prompt = build_prompt(&self.instruction, current, command)?;
        let backend = self.backend.as_ref().ok_or(AgentError::ModelNotConfigured)?;

        debug!("model prompt ({} chars):\n{prompt}", prompt.len());
        let raw = match tokio::time::timeout(self.invoke_timeout, backend.invoke(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                error!("model invocation failed: {err}");
                return Err(AgentError::ModelInvocationFailed(err));
            }
            Err(_) => {
                error!("model invocation timed out after {:?}", self.invoke_timeout);
                return Err(AgentError::ModelTimeout(self.invoke_timeout));
            }
        };

        let text = raw.into_text().ok_or(AgentError::ModelOutputEmpty)?;
        debug!("raw model output ({} chars):\n{text}", text.len());

        let json_text = extract_json(&text, backend.wraps_output());
        parse_agent_response(&json_text, &self.catalog)
    }

    pub async fn adjust_ui(&self, command: &str, current: &UiState) -> Result<AdjustOutcome, AgentError> {
        validate_state(current, "current_ui", &self.catalog)
            .map_err(|violation| AgentError::InvalidRequest(violation.to_string()))?;

        let result = self.call_agent(command, current).await?;
        if !result.success {
            info!("command rejected by model: {command:?}");
            return Ok(AdjustOutcome::rejected(result.message));
        }

        let merged = reconcile(current, result.updated_config.as_ref(), &self.catalog)?;
        info!("command applied: {command:?} ({} components)", merged.components.len());
        Ok(AdjustOutcome::accepted(result.message, merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::model::{ComponentConfig, ComponentId, Theme, VisualizationType, Zone};
    use crate::llm::scripted::ScriptedModel;

    fn state() -> UiState {
        let catalog = ComponentCatalog::standard();
        let components = [ComponentId::Altitude, ComponentId::Airspeed, ComponentId::Rpm, ComponentId::Phase]
            .into_iter()
            .enumerate()
            .map(|(index, id)| ComponentConfig {
                id,
                label: catalog.label(id).to_string(),
                visible: true,
                zone: Zone::Primary,
                order: index as i64 + 1,
                color: None,
                bg_color: None,
                scale: 1.0,
                is_core: true,
                visualization_type: VisualizationType::Text,
            })
            .collect();
        UiState { theme: Theme::Dark, components }
    }

    #[tokio::test]
    async fn success_without_config_keeps_current_state() {
        let model = Arc::new(ScriptedModel::remote().with_reply(r#"{"success": true}"#));
        let agent = CockpitAgent::new(Some(model));
        let outcome = agent.adjust_ui("Keep everything", &state()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, DEFAULT_ACCEPTED_MESSAGE);
        assert_eq!(outcome.new_state, Some(state()));
    }

    #[tokio::test]
    async fn rejection_without_message_gets_default() {
        let model = Arc::new(ScriptedModel::remote().with_reply(r#"{"success": false, "message": "  "}"#));
        let outcome = CockpitAgent::new(Some(model)).adjust_ui("Hide rpm", &state()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, DEFAULT_REJECTED_MESSAGE);
        assert!(outcome.new_state.is_none());
    }

    #[tokio::test]
    async fn invalid_current_state_is_an_invalid_request() {
        let mut current = state();
        current.components[0].zone = Zone::Secondary;
        let model = Arc::new(ScriptedModel::remote().with_reply(r#"{"success": true}"#));
        let err = CockpitAgent::new(Some(model.clone())).adjust_ui("x", &current).await.unwrap_err();
        assert_eq!(err.kind(), "InvalidRequest");
        assert_eq!(model.call_count(), 0);
    }

    #[test]
    fn outcome_serializes_to_the_response_shape() {
        let rejected = serde_json::to_value(AdjustOutcome::rejected(None)).unwrap();
        assert_eq!(rejected, serde_json::json!({"success": false, "message": "Command rejected."}));

        let accepted = serde_json::to_value(AdjustOutcome::accepted(Some("Done.".into()), state())).unwrap();
        assert_eq!(accepted["success"], true);
        assert_eq!(accepted["newState"]["theme"], "dark");
        assert_eq!(accepted["newState"]["components"][0]["id"], "altitude");
    }
}
