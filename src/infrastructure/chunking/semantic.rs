use text_splitter::{ChunkConfig, TextSplitter};

use crate::domain::{ports::TextChunker, DomainError};

/// Splits at the largest semantic boundary (paragraph, sentence, word)
/// that keeps each chunk within `chunk_size` characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSplitterChunker;

impl TextSplitterChunker {
    pub fn new() -> Self {
        Self
    }
}

impl TextChunker for TextSplitterChunker {
    fn split(
        &self,
        content: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<String>, DomainError> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        Ok(TextSplitter::new(config)
            .chunks(content)
            .map(String::from)
            .collect())
    }
}
