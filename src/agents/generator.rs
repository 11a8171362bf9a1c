use crate::{
    agents::prompts::{render_system_prompt, DEFAULT_SYSTEM_PROMPT},
    llm::{ChatMessage, LLMClient},
    memory::{truncate_history, DEFAULT_HISTORY_WINDOW},
    types::{AppError, DocumentChunk, Result, Turn},
};
use std::sync::Arc;

/// Produces the coach's reply from a standalone question and retrieved chunks.
///
/// Chunk texts are stuffed into the persona template; ids and offsets never
/// reach the model.
#[derive(Clone)]
pub struct AnswerGenerator {
    llm: Arc<dyn LLMClient>,
    persona: String,
    history_window: usize,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self {
            llm,
            persona: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Persona template; must contain `{context}`.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn build_messages(
        &self,
        history: &[Turn],
        question: &str,
        chunks: &[DocumentChunk],
    ) -> Vec<ChatMessage> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let window = truncate_history(history, self.history_window);

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(ChatMessage::system(render_system_prompt(
            &self.persona,
            &texts,
        )));
        messages.extend(window.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(question));
        messages
    }

    pub async fn generate(
        &self,
        history: &[Turn],
        question: &str,
        chunks: &[DocumentChunk],
    ) -> Result<String> {
        let answer = self
            .llm
            .generate_with_history(&self.build_messages(history, question, chunks))
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AppError::Generation(
                "model returned an empty answer".to_string(),
            ));
        }
        Ok(answer.to_string())
    }
}
