use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{BackendKind, ModelBackend, ModelError, RawModelOutput};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_NEW_TOKENS: u32 = 512;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Local model served by Ollama's `/api/generate`. Decoding is greedy so the
/// same prompt yields the same layout.
pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.http.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!("ollama probe failed: {err}");
                false
            }
        }
    }
}

#[async_trait]
impl ModelBackend for OllamaClient {
    async fn invoke(&self, prompt: &str) -> Result<RawModelOutput, ModelError> {
        let url = format!("{}/api/generate", self.endpoint);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.0,
                num_predict: MAX_NEW_TOKENS,
            },
        };

        let response = self.http.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                backend: "ollama",
                status,
                body,
            });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidBody(err.to_string()))?;
        Ok(RawModelOutput::PlainText(generated.response))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
