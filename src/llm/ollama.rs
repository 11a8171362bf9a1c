use crate::llm::client::{ChatMessage, LLMClient, MessageRole};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage as OllamaMessage},
    Ollama,
};

const DEFAULT_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        let (scheme, host, port) = parse_base_url(base_url)?;
        let client = Ollama::new(format!("{}://{}", scheme, host), port);
        Ok(Self { client, model })
    }
}

/// Split `http://host:port` into its parts. Scheme defaults to http and port to 11434.
fn parse_base_url(base_url: &str) -> Result<(String, String, u16)> {
    let (scheme, rest) = match base_url.split_once("://") {
        Some((scheme, rest)) => (scheme.to_string(), rest),
        None => ("http".to_string(), base_url),
    };
    let rest = rest.trim_end_matches('/');

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| {
                AppError::Configuration(format!("Invalid Ollama port in '{}'", base_url))
            })?;
            (host.to_string(), port)
        }
        None => (rest.to_string(), DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(AppError::Configuration(format!(
            "Invalid Ollama base URL '{}'",
            base_url
        )));
    }

    Ok((scheme, host, port))
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_history(&self, messages: &[ChatMessage]) -> Result<String> {
        let chat_messages: Vec<OllamaMessage> = messages
            .iter()
            .map(|m| match m.role {
                MessageRole::System => OllamaMessage::system(m.content.clone()),
                MessageRole::User => OllamaMessage::user(m.content.clone()),
                MessageRole::Assistant => OllamaMessage::assistant(m.content.clone()),
            })
            .collect();

        let request = ChatMessageRequest::new(self.model.clone(), chat_messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
