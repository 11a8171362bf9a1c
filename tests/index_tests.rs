//! Embedding index integration tests
//!
//! Persistence across reopen, fingerprint reuse and ranking behaviour.

mod common;

use common::mocks::{hashing_embedder, CountingEmbedder};
use common::{rag_config, write_corpus, CORPUS};
use openspeak::rag::chunker::TextChunker;
use openspeak::rag::index::EmbeddingIndex;
use openspeak::rag::KnowledgeBase;
use openspeak_vector::{Config as VectorConfig, VectorDb};
use std::sync::Arc;
use tempfile::TempDir;

async fn persistent_kb(dir: &TempDir, embedder: Arc<CountingEmbedder>) -> KnowledgeBase {
    let corpus = dir.path().join("context.txt");
    let rag = rag_config(&corpus, &dir.path().join("vectors"));
    let db = VectorDb::open(VectorConfig::persistent(&rag.data_dir))
        .await
        .unwrap();
    KnowledgeBase::with_store(db, embedder, &rag).unwrap()
}

fn texts(index_results: &[openspeak::types::DocumentChunk]) -> Vec<String> {
    index_results.iter().map(|c| c.text.clone()).collect()
}

#[tokio::test]
async fn test_reopen_reuses_persisted_index() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());

    let first = Arc::new(CountingEmbedder::new());
    let kb = persistent_kb(&dir, Arc::clone(&first)).await;
    let report = kb.refresh().await.unwrap();
    assert!(!report.reused);
    assert!(report.source_available);
    assert!(report.chunk_count > 0);
    assert_eq!(first.embedded(), report.chunk_count);
    let before = texts(&kb.index().search("How do I add emphasis?", 2).await.unwrap());
    drop(kb);

    // A fresh process: new store handle, new embedder.
    let second = Arc::new(CountingEmbedder::new());
    let kb = persistent_kb(&dir, Arc::clone(&second)).await;
    let report = kb.refresh().await.unwrap();
    assert!(report.reused);
    assert_eq!(second.embedded(), 0);

    let after = texts(&kb.index().search("How do I add emphasis?", 2).await.unwrap());
    assert_eq!(before, after);
    // Only the query was embedded.
    assert_eq!(second.embedded(), 1);
}

#[tokio::test]
async fn test_changed_corpus_triggers_rebuild() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(dir.path());

    let embedder = Arc::new(CountingEmbedder::new());
    let kb = persistent_kb(&dir, Arc::clone(&embedder)).await;
    kb.refresh().await.unwrap();

    std::fs::write(&corpus, format!("{CORPUS}\n\nPosture. Stand tall with relaxed shoulders.")).unwrap();
    let report = kb.refresh().await.unwrap();
    assert!(!report.reused);

    let top = kb.index().search("relaxed shoulders posture", 1).await.unwrap();
    assert!(top[0].text.contains("relaxed shoulders"));
}

#[tokio::test]
async fn test_forced_rebuild_gives_identical_rankings() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());

    let embedder = Arc::new(CountingEmbedder::new());
    let kb = persistent_kb(&dir, Arc::clone(&embedder)).await;
    let first = kb.refresh().await.unwrap();
    let before = kb.index().search_scored("filler words", 3).await.unwrap();

    let second = kb.rebuild().await.unwrap();
    assert!(!second.reused);
    assert_eq!(first.chunk_count, second.chunk_count);
    assert_eq!(embedder.embedded(), first.chunk_count * 2 + 1);

    let after = kb.index().search_scored("filler words", 3).await.unwrap();
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.chunk.text, b.chunk.text);
        assert_eq!(a.chunk.source_offset, b.chunk.source_offset);
        assert!((a.score - b.score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_search_is_bounded_and_ordered() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(dir.path());
    let db = VectorDb::open(VectorConfig::memory()).await.unwrap();
    let index = EmbeddingIndex::new(db, hashing_embedder(), "coach");
    let chunker = TextChunker::new(120, 30).unwrap();
    let report = index.load_or_build(&corpus, &chunker).await.unwrap();
    assert!(report.chunk_count > 4);

    let results = index.search_scored("add emphasis to a key point", 4).await.unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results[0].chunk.text.contains("emphasis"));

    let all = index.search("add emphasis", 100).await.unwrap();
    assert_eq!(all.len(), report.chunk_count);
}

#[tokio::test]
async fn test_empty_corpus_file_gives_empty_results() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("empty.txt");
    std::fs::write(&corpus, "").unwrap();

    let db = VectorDb::open(VectorConfig::memory()).await.unwrap();
    let index = EmbeddingIndex::new(db, hashing_embedder(), "coach");
    let report = index
        .load_or_build(&corpus, &TextChunker::new(900, 200).unwrap())
        .await
        .unwrap();

    assert!(report.source_available);
    assert_eq!(report.chunk_count, 0);
    assert!(index.search("anything", 4).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_corpus_keeps_persisted_index() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(dir.path());

    let kb = persistent_kb(&dir, Arc::new(CountingEmbedder::new())).await;
    let built = kb.refresh().await.unwrap();
    drop(kb);
    std::fs::remove_file(&corpus).unwrap();

    let kb = persistent_kb(&dir, Arc::new(CountingEmbedder::new())).await;
    let report = kb.refresh().await.unwrap();
    assert!(!report.source_available);
    assert!(report.reused);
    assert_eq!(report.chunk_count, built.chunk_count);

    let hits = kb.index().search("How do I add emphasis?", 4).await.unwrap();
    assert!(texts(&hits).iter().any(|t| t.contains("To add emphasis")));
}

#[tokio::test]
async fn test_index_from_other_corpus_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "Pause before key points to add emphasis.").unwrap();

    // `index --corpus notes.txt`; the configured context.txt never exists.
    let kb = persistent_kb(&dir, Arc::new(CountingEmbedder::new()))
        .await
        .with_corpus(&notes);
    let built = kb.refresh().await.unwrap();
    assert_eq!(built.chunk_count, 1);
    drop(kb);

    // A later `ask` opens with the configured corpus path.
    let embedder = Arc::new(CountingEmbedder::new());
    let kb = persistent_kb(&dir, Arc::clone(&embedder)).await;
    let report = kb.resume().await.unwrap();
    assert!(report.source_available);
    assert!(report.reused);
    assert_eq!(report.chunk_count, 1);
    assert!(report.source.ends_with("notes.txt"));
    assert_eq!(embedder.embedded(), 0);

    let hits = kb.index().search("How do I add emphasis?", 4).await.unwrap();
    assert_eq!(texts(&hits), vec!["Pause before key points to add emphasis."]);

    // Even the configured path alone no longer wipes it.
    let report = kb.refresh().await.unwrap();
    assert_eq!(report.chunk_count, 1);
    assert_eq!(kb.index().len(), 1);
}

#[tokio::test]
async fn test_resume_follows_edits_to_recorded_corpus() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "Pause before key points to add emphasis.").unwrap();

    let kb = persistent_kb(&dir, Arc::new(CountingEmbedder::new()))
        .await
        .with_corpus(&notes);
    kb.refresh().await.unwrap();
    drop(kb);

    std::fs::write(&notes, format!("{CORPUS}\n\nPosture. Stand tall.")).unwrap();

    let kb = persistent_kb(&dir, Arc::new(CountingEmbedder::new())).await;
    let report = kb.resume().await.unwrap();
    assert!(!report.reused);
    assert!(report.chunk_count > 1);
}
