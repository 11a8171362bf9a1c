#![allow(dead_code)]

pub mod mocks;

use openspeak::rag::embeddings::Embedder;
use openspeak::rag::KnowledgeBase;
use openspeak::utils::toml_config::RagConfig;
use openspeak::{AppState, CoachConfig, LLMClient};
use openspeak_vector::{Config as VectorConfig, VectorDb};
use std::path::Path;
use std::sync::Arc;

/// A small speaking-coach corpus. The emphasis passage is the only one
/// mentioning emphasis.
pub const CORPUS: &str = "\
Breathing. Breathe from the diaphragm before you start speaking. Slow, deep breaths calm nerves and support a steady voice.

Emphasis. To add emphasis to a key point, pause briefly before it, slow down, and raise your volume slightly. Stress the important word rather than the whole sentence.

Eye contact. Hold eye contact with one listener for a full thought, then move to another part of the room.

Filler words. Replace filler words such as um and uh with a short silent pause. Record yourself to notice habits.";

/// Configuration pointing at `corpus` with small chunks so the corpus
/// yields several of them.
pub fn rag_config(corpus: &Path, data_dir: &Path) -> RagConfig {
    RagConfig {
        corpus_path: corpus.to_path_buf(),
        data_dir: data_dir.to_path_buf(),
        chunk_size: 200,
        chunk_overlap: 40,
        ..RagConfig::default()
    }
}

/// In-memory knowledge base over `corpus`, already indexed.
pub async fn knowledge_base(
    corpus: &Path,
    embedder: Arc<dyn Embedder>,
) -> KnowledgeBase {
    let db = VectorDb::open(VectorConfig::memory()).await.unwrap();
    let rag = rag_config(corpus, Path::new("unused"));
    let kb = KnowledgeBase::with_store(db, embedder, &rag).unwrap();
    kb.refresh().await.unwrap();
    kb
}

/// Full pipeline over `corpus` driven by `llm`.
pub async fn app_state(corpus: &Path, llm: Arc<dyn LLMClient>) -> AppState {
    app_state_with(CoachConfig::default(), corpus, llm).await
}

/// Like [`app_state`] but keeps everything except `rag` from `config`.
pub async fn app_state_with(
    mut config: CoachConfig,
    corpus: &Path,
    llm: Arc<dyn LLMClient>,
) -> AppState {
    config.rag = rag_config(corpus, Path::new("unused"));
    let kb = knowledge_base(corpus, mocks::hashing_embedder()).await;
    AppState::assemble(config, kb, llm)
}

/// Write [`CORPUS`] into `dir` and return its path.
pub fn write_corpus(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("context.txt");
    std::fs::write(&path, CORPUS).unwrap();
    path
}
