//! Model backends behind a single `invoke(prompt)` seam.
//!
//! Local models (Ollama) answer with plain text and are known to wrap their
//! JSON in fences and prose. Remote OpenAI-compatible chat models answer with a
//! message whose `content` is trusted to be the bare object.

pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod scripted;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ModelConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum RawModelOutput {
    PlainText(String),
    ChatMessage { content: String },
}

impl RawModelOutput {
    /// The text of either shape, or `None` when it is blank.
    pub fn into_text(self) -> Option<String> {
        let text = match self {
            RawModelOutput::PlainText(text) => text,
            RawModelOutput::ChatMessage { content } => content,
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Remote,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{backend} returned HTTP {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Http(err.to_string())
    }
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<RawModelOutput, ModelError>;

    fn kind(&self) -> BackendKind;

    fn model_name(&self) -> &str;

    /// Whether output needs fence/prose cleaning before parsing.
    fn wraps_output(&self) -> bool {
        self.kind() == BackendKind::Local
    }
}

/// Picks the backend the configuration asks for. A local model that does not
/// answer its health probe falls back to the remote model; no API key means no
/// backend at all, which is reported per request rather than at startup.
pub async fn init_backend(config: &ModelConfig) -> Option<Arc<dyn ModelBackend>> {
    if config.use_local_model {
        match ollama::OllamaClient::new(&config.local_endpoint, &config.local_model) {
            Ok(client) if client.is_available().await => {
                info!("using local model {} at {}", config.local_model, config.local_endpoint);
                return Some(Arc::new(client));
            }
            Ok(_) => warn!("local model endpoint {} unreachable, falling back to remote model", config.local_endpoint),
            Err(err) => warn!("local model client failed to start ({err}), falling back to remote model"),
        }
    }

    let Some(remote) = config.remote() else {
        warn!("no model configured: set USE_LOCAL_MODEL=true or OPENAI_API_KEY");
        return None;
    };
    match openai::ChatClient::new(&remote.api_key, &remote.base_url, &remote.model) {
        Ok(client) => {
            info!("using remote model {} via {}", remote.model, remote.base_url);
            Some(Arc::new(client))
        }
        Err(err) => {
            warn!("remote model client failed to start: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_output_shapes_normalize_to_text() {
        assert_eq!(RawModelOutput::PlainText("{}".into()).into_text().as_deref(), Some("{}"));
        assert_eq!(
            RawModelOutput::ChatMessage { content: " {} ".into() }.into_text().as_deref(),
            Some(" {} ")
        );
    }

    #[test]
    fn blank_output_normalizes_to_none() {
        assert_eq!(RawModelOutput::PlainText("  \n ".into()).into_text(), None);
        assert_eq!(RawModelOutput::ChatMessage { content: String::new() }.into_text(), None);
    }

    #[tokio::test]
    async fn no_key_and_no_local_model_means_no_backend() {
        let config = ModelConfig::default();
        assert!(init_backend(&config).await.is_none());
    }
}
