//! Text chunking for document ingestion.
//!
//! The default [`ChunkStrategy::Window`] slides a fixed window of `chunk_size`
//! characters over the text, stepping by `chunk_size - chunk_overlap`, so
//! neighbouring chunks share exactly `chunk_overlap` characters and the chunks
//! together cover every character of the source.

use crate::types::{AppError, DocumentChunk, Result};
use serde::{Deserialize, Serialize};
use text_splitter::{ChunkConfig, TextSplitter};

/// How a document is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Fixed character window with exact overlap.
    #[default]
    Window,
    /// Semantic boundaries (paragraphs, sentences, words) via `text-splitter`.
    /// Size and overlap are upper bounds only.
    Recursive,
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    strategy: ChunkStrategy,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            strategy: ChunkStrategy::Window,
        })
    }

    pub fn with_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// Split `text` into unembedded chunks. Empty text yields no chunks.
    pub fn chunk(&self, text: &str) -> Result<Vec<DocumentChunk>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        match self.strategy {
            ChunkStrategy::Window => Ok(self.chunk_window(text)),
            ChunkStrategy::Recursive => self.chunk_recursive(text),
        }
    }

    fn chunk_window(&self, text: &str) -> Vec<DocumentChunk> {
        // Byte position of every char, plus the end, so windows slice on char boundaries.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_count = boundaries.len();
        boundaries.push(text.len());

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(char_count);
            chunks.push(DocumentChunk::unembedded(
                &text[boundaries[start]..boundaries[end]],
                start,
            ));
            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }

    fn chunk_recursive(&self, text: &str) -> Result<Vec<DocumentChunk>> {
        let config = ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| AppError::Configuration(e.to_string()))?;
        let splitter = TextSplitter::new(config);

        Ok(splitter
            .chunk_indices(text)
            .map(|(byte_offset, chunk)| {
                DocumentChunk::unembedded(chunk, text[..byte_offset].chars().count())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn texts(chunks: &[DocumentChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(10, 10).is_err());
        assert!(TextChunker::new(10, 12).is_err());
        assert!(TextChunker::new(10, 9).is_ok());
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = TextChunker::new(900, 200).unwrap();
        assert!(chunker.chunk("").unwrap().is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = TextChunker::new(900, 200).unwrap();
        let chunks = chunker.chunk("Pause before key points.").unwrap();
        assert_eq!(texts(&chunks), vec!["Pause before key points."]);
        assert_eq!(chunks[0].source_offset, 0);
    }

    #[test]
    fn test_window_layout() {
        let chunker = TextChunker::new(4, 2).unwrap();
        let chunks = chunker.chunk("abcdefghij").unwrap();
        assert_eq!(texts(&chunks), vec!["abcd", "cdef", "efgh", "ghij"]);
        let offsets: Vec<usize> = chunks.iter().map(|c| c.source_offset).collect();
        assert_eq!(offsets, vec![0, 2, 4, 6]);
    }

    #[test]
    fn test_final_chunk_may_be_short() {
        let chunker = TextChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk("abcdefgh").unwrap();
        assert_eq!(texts(&chunks), vec!["abcd", "defg", "gh"]);
    }

    #[test]
    fn test_multibyte_text_splits_on_chars() {
        let chunker = TextChunker::new(3, 1).unwrap();
        let chunks = chunker.chunk("héllo wörld").unwrap();
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 3);
        }
        assert_eq!(chunks[0].text, "hél");
        assert_eq!(chunks[1].text, "llo");
    }

    #[rstest]
    #[case(900, 200, 5000)]
    #[case(900, 200, 901)]
    #[case(900, 200, 900)]
    #[case(50, 10, 333)]
    #[case(7, 6, 40)]
    #[case(10, 0, 95)]
    fn test_window_covers_source_with_exact_overlap(
        #[case] size: usize,
        #[case] overlap: usize,
        #[case] len: usize,
    ) {
        let source: String = (0..len)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let chunker = TextChunker::new(size, overlap).unwrap();
        let chunks = chunker.chunk(&source).unwrap();

        // Every chunk is bounded and sits at its offset.
        for chunk in &chunks {
            let n = chunk.text.chars().count();
            assert!(n <= size);
            assert_eq!(&source[chunk.source_offset..chunk.source_offset + n], chunk.text);
        }

        // No gaps: each chunk starts at or before the end of its predecessor.
        assert_eq!(chunks[0].source_offset, 0);
        let last = chunks.last().unwrap();
        assert_eq!(last.source_offset + last.text.chars().count(), len);

        for pair in chunks.windows(2) {
            let prev_end = pair[0].source_offset + pair[0].text.chars().count();
            assert_eq!(prev_end - pair[1].source_offset, overlap);
        }
    }

    #[test]
    fn test_recursive_strategy_respects_size() {
        let chunker = TextChunker::new(40, 10)
            .unwrap()
            .with_strategy(ChunkStrategy::Recursive);
        let text = "Pause before key points. Breathe from the diaphragm. \
                    Slow down when you feel rushed. Smile at the audience.";
        let chunks = chunker.chunk(text).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 40);
            assert!(text.chars().skip(chunk.source_offset).collect::<String>().starts_with(&chunk.text));
        }
    }
}
