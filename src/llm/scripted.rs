use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{BackendKind, ModelBackend, ModelError, RawModelOutput};

/// Backend that replays queued outputs, for tests and offline demos.
///
/// Outputs are popped in order; the last one keeps being returned.
pub struct ScriptedModel {
    kind: BackendKind,
    outputs: Mutex<VecDeque<Result<RawModelOutput, ModelError>>>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            outputs: Mutex::new(VecDeque::new()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn local() -> Self {
        Self::new(BackendKind::Local)
    }

    pub fn remote() -> Self {
        Self::new(BackendKind::Remote)
    }

    /// Queues text in the shape this backend kind produces.
    pub fn with_reply(self, text: &str) -> Self {
        let output = match self.kind {
            BackendKind::Local => RawModelOutput::PlainText(text.to_string()),
            BackendKind::Remote => RawModelOutput::ChatMessage { content: text.to_string() },
        };
        self.with_output(output)
    }

    pub fn with_output(self, output: RawModelOutput) -> Self {
        self.push(Ok(output))
    }

    pub fn with_error(self, err: ModelError) -> Self {
        self.push(Err(err))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn push(self, output: Result<RawModelOutput, ModelError>) -> Self {
        self.outputs.lock().unwrap_or_else(PoisonError::into_inner).push_back(output);
        self
    }

    fn next_output(&self) -> Result<RawModelOutput, ModelError> {
        let mut outputs = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
        match outputs.len() {
            0 => Ok(RawModelOutput::PlainText(String::new())),
            1 => outputs[0].clone(),
            _ => outputs.pop_front().unwrap_or_else(|| Ok(RawModelOutput::PlainText(String::new()))),
        }
    }
}

#[async_trait]
impl ModelBackend for ScriptedModel {
    async fn invoke(&self, prompt: &str) -> Result<RawModelOutput, ModelError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_output()
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
