use std::time::Duration;

use thiserror::Error;

use crate::layout::validator::FieldError;
use crate::llm::ModelError;

/// Everything that can end a command request. Each variant is recoverable at
/// the serving boundary and maps to its own externally visible kind.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no language model is configured")]
    ModelNotConfigured,

    #[error("model invocation failed: {0}")]
    ModelInvocationFailed(ModelError),

    #[error("model did not answer within {}s", .0.as_secs_f64())]
    ModelTimeout(Duration),

    #[error("model returned no usable text")]
    ModelOutputEmpty,

    #[error("model response is not valid JSON: {message} (excerpt: {excerpt})")]
    ResponseMalformed { message: String, excerpt: String },

    #[error("model response violates the layout schema: {violation}")]
    SchemaViolation { violation: FieldError, excerpt: String },
}

impl AgentError {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::InvalidRequest(_) => "InvalidRequest",
            AgentError::ModelNotConfigured => "ModelNotConfigured",
            AgentError::ModelInvocationFailed(_) => "ModelInvocationFailed",
            AgentError::ModelTimeout(_) => "ModelTimeout",
            AgentError::ModelOutputEmpty => "ModelOutputEmpty",
            AgentError::ResponseMalformed { .. } => "ResponseMalformed",
            AgentError::SchemaViolation { .. } => "SchemaViolation",
        }
    }
}

impl From<ModelError> for AgentError {
    fn from(err: ModelError) -> Self {
        AgentError::ModelInvocationFailed(err)
    }
}
