//! Primary/fallback model routing.
//!
//! A [`ModelRoute`] behaves like a single [`LLMClient`]. When the primary
//! call fails and a fallback is configured, the same messages are sent to the
//! fallback exactly once; its error, if any, is the one surfaced.

use crate::llm::client::{ChatMessage, LLMClient};
use crate::types::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct ModelRoute {
    primary: Arc<dyn LLMClient>,
    fallback: Option<Arc<dyn LLMClient>>,
}

impl ModelRoute {
    pub fn new(primary: Arc<dyn LLMClient>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn LLMClient>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[async_trait]
impl LLMClient for ModelRoute {
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        match self.primary.generate_with_history(messages).await {
            Ok(text) => Ok(text),
            Err(e) => match self.fallback {
                Some(ref fallback) => {
                    warn!(
                        primary = self.primary.model_name(),
                        fallback = fallback.model_name(),
                        error = %e,
                        "Primary model failed, using fallback"
                    );
                    fallback.generate_with_history(messages).await
                }
                None => Err(e),
            },
        }
    }

    fn model_name(&self) -> &str {
        self.primary.model_name()
    }
}
