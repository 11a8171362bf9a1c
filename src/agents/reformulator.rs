use crate::{
    agents::prompts::DEFAULT_REFORMULATE_PROMPT,
    llm::{ChatMessage, LLMClient},
    memory::{truncate_history, DEFAULT_HISTORY_WINDOW},
    types::{AppError, Result, Turn},
};
use std::sync::Arc;
use tracing::debug;

/// Rewrites a follow-up message into a question that stands on its own.
///
/// With no prior turns the input already stands alone and is returned as-is
/// without calling the model.
#[derive(Clone)]
pub struct QueryReformulator {
    llm: Arc<dyn LLMClient>,
    instructions: String,
    history_window: usize,
}

impl QueryReformulator {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self {
            llm,
            instructions: DEFAULT_REFORMULATE_PROMPT.to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Message list sent to the model: instructions, recent turns, then the input.
    pub fn build_messages(&self, history: &[Turn], input: &str) -> Vec<ChatMessage> {
        let window = truncate_history(history, self.history_window);
        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(ChatMessage::system(self.instructions.clone()));
        messages.extend(window.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(input));
        messages
    }

    pub async fn reformulate(&self, history: &[Turn], input: &str) -> Result<String> {
        if history.is_empty() {
            return Ok(input.to_string());
        }

        let raw = self
            .llm
            .generate_with_history(&self.build_messages(history, input))
            .await
            .map_err(|e| AppError::Reformulation(e.to_string()))?;

        let question = clean(&raw);
        if question.is_empty() {
            return Err(AppError::Reformulation(
                "model returned an empty question".to_string(),
            ));
        }

        debug!(input, question, "Reformulated query");
        Ok(question.to_string())
    }
}

// Models sometimes wrap the rewrite in quotes.
fn clean(raw: &str) -> &str {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim()
}
