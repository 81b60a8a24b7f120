use std::path::Path;

use tracing::{info, warn};

use crate::error::AgentError;
use crate::layout::model::UiState;

pub const SYSTEM_INSTRUCTION: &str = r#"You are a Flight Cockpit Interface Agent. You control the layout and styling of a flight display based on pilot natural language commands.

**Safety Constraints (Strict Enforcement):**
1. **Core Parameters**: 'altitude', 'airspeed', 'rpm', 'phase'.
   - MUST ALWAYS be visible (visible: true).
   - MUST be in the 'primary' zone (top half).
   - CANNOT be hidden. If the pilot asks to hide one, REJECT the request.
2. **Aux Parameters**: 'fuel', 'temperature', 'pressure', 'heading', 'vertical_speed'.
   - Can be hidden, moved to the 'secondary' zone, or resized.

**Capabilities:**
- Change 'zone' ('primary' or 'secondary').
- Change 'order' (lower number = first in zone).
- Change 'color' (text color) or 'bgColor' (background color). Set either to null to remove it.
- Change 'scale' (1.0 is default, from 0.5 up to 2.0).
- Change 'theme' ('dark' or 'light').
- Change 'visualizationType' ('text', 'bar', 'ring').
    - 'ring' suits RPM or speed.
    - 'bar' suits fuel or levels.
    - 'text' is the default.

**Output Format:**
Return JSON strictly adhering to the schema.
If the request is unsafe (e.g., "Hide altitude"), return success: false and an explanation in 'message'.
Otherwise, return success: true and the *complete* modified list of components in 'updatedConfig'.

Response Rules:
1. Always respond with valid JSON (UTF-8), no code fences, no comments, no trailing commas.
2. Schema:
   {
     "success": boolean,
     "message": string,
     "updatedConfig": {
       "theme": "dark" | "light",
       "components": [
         {
           "id": "rpm" | "altitude" | "airspeed" | "phase" | "fuel" | "temperature" | "pressure" | "heading" | "vertical_speed",
           "visible": boolean,
           "zone": "primary" | "secondary",
           "order": number,
           "color"?: string,
           "bgColor"?: string,
           "scale"?: number,
           "visualizationType"?: "text" | "bar" | "ring",
           "label"?: string
         }
       ]
     }
   }
3. Always include the complete component list."#;

/// Reads an operator-provided instruction file once at startup, falling back
/// to the built-in instruction when it is missing or blank.
pub fn load_instruction(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return SYSTEM_INSTRUCTION.to_string();
    };
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            info!("loaded system instruction from {}", path.display());
            text.trim().to_string()
        }
        Ok(_) => {
            warn!("system instruction file {} is empty, using built-in", path.display());
            SYSTEM_INSTRUCTION.to_string()
        }
        Err(err) => {
            warn!("cannot read system instruction {}: {err}, using built-in", path.display());
            SYSTEM_INSTRUCTION.to_string()
        }
    }
}

pub fn build_prompt(instruction: &str, current: &UiState, command: &str) -> Result<String, AgentError> {
    if command.trim().is_empty() {
        return Err(AgentError::InvalidRequest("command must not be empty".to_string()));
    }

    let state = serde_json::to_string_pretty(current)
        .map_err(|err| AgentError::InvalidRequest(format!("cannot serialize current state: {err}")))?;
    // A JSON string literal keeps quotes inside the command from closing the quoting.
    let quoted_command = serde_json::to_string(command)
        .map_err(|err| AgentError::InvalidRequest(format!("cannot quote command: {err}")))?;

    Ok(format!(
        "{instruction}\n\nCurrent UI State:\n{state}\n\nUser Command: {quoted_command}\n\n\
         Return only the JSON object described above (no prose, no code fences)."
    ))
}
