use crate::{
    agents::generator::AnswerGenerator,
    memory::{estimate_tokens, SessionStore},
    rag::retriever::Retriever,
    types::{AppError, ChatAnswer, PipelineError, Stage, Turn},
};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};

/// Session-aware conversation pipeline.
///
/// Each [`invoke`](Self::invoke) runs
/// `load_history → reformulate → retrieve → generate → persist` in order.
/// History is a snapshot taken before the call; the (message, answer) pair is
/// appended only after generation succeeds, in a single store operation, so
/// a failed or cancelled invocation leaves the session untouched.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    sessions: Arc<SessionStore>,
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl ConversationOrchestrator {
    pub fn new(sessions: Arc<SessionStore>, retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self {
            sessions,
            retriever,
            generator,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn invoke(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatAnswer, PipelineError> {
        let span = info_span!("invoke", session_id);
        self.run(session_id, message).instrument(span).await
    }

    async fn run(&self, session_id: &str, message: &str) -> Result<ChatAnswer, PipelineError> {
        let fail = |stage: Stage, source: AppError| {
            warn!(%stage, error = %source, "Invocation failed");
            PipelineError::new(session_id, stage, source)
        };

        debug!(stage = %Stage::LoadHistory);
        let history = self.sessions.history(session_id).await;

        debug!(stage = %Stage::Reformulate, turns = history.len());
        let question = self
            .retriever
            .reformulator()
            .reformulate(&history, message)
            .await
            .map_err(|e| fail(Stage::Reformulate, e))?;

        debug!(stage = %Stage::Retrieve, question);
        let chunks = self
            .retriever
            .search(&question)
            .await
            .map_err(|e| fail(Stage::Retrieve, e))?;
        let documents: Vec<_> = chunks.into_iter().map(|s| s.chunk).collect();

        debug!(
            stage = %Stage::Generate,
            chunks = documents.len(),
            context_tokens = documents.iter().map(|d| estimate_tokens(&d.text)).sum::<usize>()
        );
        let answer = self
            .generator
            .generate(&history, &question, &documents)
            .await
            .map_err(|e| fail(Stage::Generate, e))?;

        debug!(stage = %Stage::Persist);
        self.sessions
            .append_exchange(session_id, Turn::user(message), Turn::assistant(answer.clone()))
            .await;

        Ok(ChatAnswer { answer })
    }
}
