//! Scripted [`GenerationClient`] for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use super::{GenAiError, GenerationClient, GenerationRequest};

type Responder = Box<dyn Fn(&GenerationRequest) -> Result<Value, GenAiError> + Send + Sync>;
type Delay = Box<dyn Fn(&GenerationRequest) -> Option<Duration> + Send + Sync>;

#[derive(Default)]
pub struct StubModel {
    responders: HashMap<String, Responder>,
    delay: Option<Delay>,
    calls: AtomicUsize,
    log: Mutex<Vec<GenerationRequest>>,
    speech: Option<Bytes>,
}

impl StubModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answers `prompt` with `value`.
    pub fn with_output(self, prompt: &str, value: Value) -> Self {
        self.with_responder(prompt, move |_| Ok(value.clone()))
    }

    pub fn with_responder<F>(mut self, prompt: &str, f: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<Value, GenAiError> + Send + Sync + 'static,
    {
        self.responders.insert(prompt.to_string(), Box::new(f));
        self
    }

    /// Holds matching requests back before answering them.
    pub fn with_delay<F>(mut self, f: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Option<Duration> + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(f));
        self
    }

    pub fn with_speech(mut self, pcm: &'static [u8]) -> Self {
        self.speech = Some(Bytes::from_static(pcm));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl GenerationClient for StubModel {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, GenAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(request.clone());
        if let Some(wait) = self.delay.as_ref().and_then(|d| d(&request)) {
            tokio::time::sleep(wait).await;
        }
        match self.responders.get(&request.prompt_name) {
            Some(f) => f(&request),
            None => Err(GenAiError::Status {
                status: 500,
                body: format!("no stub output for '{}'", request.prompt_name),
            }),
        }
    }

    async fn synthesize_speech(&self, _text: &str) -> Result<Bytes, GenAiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.speech
            .clone()
            .ok_or_else(|| GenAiError::Malformed("no audio returned".into()))
    }
}
