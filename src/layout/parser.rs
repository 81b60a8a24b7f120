use serde_json::Value;
use tracing::error;

use crate::error::AgentError;
use crate::layout::model::{AgentResult, ComponentCatalog};
use crate::layout::validator::{build_proposed_state, FieldError, RawUiState};

const MALFORMED_EXCERPT_CHARS: usize = 500;
const VIOLATION_EXCERPT_CHARS: usize = 1000;

/// Parses extracted model text into an [`AgentResult`], forcing any proposed
/// configuration through the layout validator.
pub fn parse_agent_response(json_text: &str, catalog: &ComponentCatalog) -> Result<AgentResult, AgentError> {
    let parsed: Value = serde_json::from_str(json_text).map_err(|err| {
        let snippet = excerpt(json_text, MALFORMED_EXCERPT_CHARS);
        error!("model response is not valid JSON: {err} | content: {snippet}");
        AgentError::ResponseMalformed {
            message: err.to_string(),
            excerpt: snippet,
        }
    })?;

    let object = parsed.as_object().ok_or_else(|| AgentError::ResponseMalformed {
        message: "expected a JSON object at the top level".to_string(),
        excerpt: excerpt(json_text, MALFORMED_EXCERPT_CHARS),
    })?;

    let success = object.get("success").and_then(Value::as_bool).unwrap_or(false);
    let message = object.get("message").and_then(Value::as_str).map(str::to_string);

    let updated_config = match object.get("updatedConfig") {
        Some(config) if is_truthy(config) => Some(
            serde_json::from_value::<RawUiState>(config.clone())
                .map_err(|err| FieldError::new("updatedConfig", excerpt(&config.to_string(), 200), err.to_string()))
                .and_then(|raw| build_proposed_state(&raw, "updatedConfig", catalog))
                .map_err(|violation| schema_violation(violation, &parsed))?,
        ),
        _ => None,
    };

    Ok(AgentResult {
        success,
        message,
        updated_config,
    })
}

fn schema_violation(violation: FieldError, parsed: &Value) -> AgentError {
    let pretty = serde_json::to_string_pretty(parsed).unwrap_or_else(|_| parsed.to_string());
    let snippet = excerpt(&pretty, VIOLATION_EXCERPT_CHARS);
    error!("model response violates the layout schema: {violation} | parsed: {snippet}");
    AgentError::SchemaViolation {
        violation,
        excerpt: snippet,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
