//! Mock implementations for testing.
//!
//! Mock LLM clients and embedders shared by the integration tests so that no
//! test needs a model server.

use async_trait::async_trait;
use openspeak::agents::prompts::DEFAULT_REFORMULATE_PROMPT;
use openspeak::llm::{ChatMessage, LLMClient, MessageRole};
use openspeak::rag::embeddings::{Embedder, HashingEmbedder};
use openspeak::types::{AppError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock LLM client with a fixed reply that records every request.
///
/// Requests whose system message is the reformulation instruction are
/// answered with the configured rewrite (or the last user message when none
/// is set), so the mock can drive the whole pipeline.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    rewrite: Option<String>,
    should_fail: bool,
    model: String,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            rewrite: None,
            should_fail: false,
            model: "mock-model".to_string(),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            model: "failing-model".to_string(),
            ..Self::new("")
        }
    }

    /// Answer reformulation requests with `rewrite`.
    pub fn with_rewrite(mut self, rewrite: &str) -> Self {
        self.rewrite = Some(rewrite.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Sleep for `delay` before answering, after the request is recorded.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every message list received, in call order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of reformulation requests received.
    pub fn reformulation_count(&self) -> usize {
        self.reformulation_calls().len()
    }

    /// Reformulation requests only, in call order.
    pub fn reformulation_calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .iter()
            .filter(|messages| is_reformulation(messages))
            .cloned()
            .collect()
    }

    /// Generation requests only, in call order.
    pub fn generation_calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .iter()
            .filter(|messages| !is_reformulation(messages))
            .cloned()
            .collect()
    }
}

fn is_reformulation(messages: &[ChatMessage]) -> bool {
    messages
        .first()
        .map(|m| m.role == MessageRole::System && m.content == DEFAULT_REFORMULATE_PROMPT)
        .unwrap_or(false)
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.lock().push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }

        if is_reformulation(messages) {
            let last_user = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            return Ok(self.rewrite.clone().unwrap_or(last_user));
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Embedder that counts how many texts it was asked to embed.
pub struct CountingEmbedder {
    inner: HashingEmbedder,
    embedded: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            inner: HashingEmbedder::new(256).unwrap(),
            embedded: AtomicUsize::new(0),
        }
    }

    pub fn embedded(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

pub fn hashing_embedder() -> Arc<dyn Embedder> {
    Arc::new(HashingEmbedder::new(256).unwrap())
}
