use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use crate::llm::{BackendKind, ModelBackend, ModelError, RawModelOutput};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 2;

/// OpenAI-compatible chat completions client. Transport errors are retried a
/// bounded number of times; HTTP error statuses are returned as-is.
pub struct ChatClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl ChatClient {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Result<Self, ModelError> {
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_retries: MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn payload(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        })
    }

    async fn send(&self, payload: &Value) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut attempt = 0;
        loop {
            match self.http.post(&url).bearer_auth(&self.api_key).json(payload).send().await {
                Err(err) if (err.is_connect() || err.is_timeout()) && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("chat completion transport error (attempt {attempt}/{}): {err}", self.max_retries);
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl ModelBackend for ChatClient {
    async fn invoke(&self, prompt: &str) -> Result<RawModelOutput, ModelError> {
        let response = self.send(&self.payload(prompt)).await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                backend: "chat completions API",
                status,
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidBody(err.to_string()))?;
        let content = extract_output_text(&value)
            .ok_or_else(|| ModelError::InvalidBody("missing choices[0].message".to_string()))?;
        Ok(RawModelOutput::ChatMessage { content })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// `choices[0].message.content`; a message with null content (a refusal) is
/// returned as empty text so it surfaces as empty output, not a body error.
fn extract_output_text(value: &Value) -> Option<String> {
    let message = value.get("choices")?.as_array()?.first()?.get("message")?;
    match message.get("content") {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Null) | None => Some(String::new()),
        Some(_) => None,
    }
}
