use crate::domain::{ports::TextChunker, DomainError};

/// Packs whole paragraphs (blank-line separated) into chunks.
///
/// Paragraphs are joined until the next one would push the chunk past
/// `chunk_size`. A single paragraph longer than that becomes its own chunk.
/// Paragraphs are never split, so `chunk_overlap` is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParagraphChunker;

impl ParagraphChunker {
    pub fn new() -> Self {
        Self
    }
}

impl TextChunker for ParagraphChunker {
    fn split(
        &self,
        content: &str,
        chunk_size: usize,
        _chunk_overlap: usize,
    ) -> Result<Vec<String>, DomainError> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for paragraph in content.split("\n\n").map(str::trim).filter(|s| !s.is_empty()) {
            let would_exceed = !current.is_empty()
                && current.chars().count() + paragraph.chars().count() + 2 > chunk_size;

            if would_exceed {
                chunks.push(std::mem::take(&mut current));
            }

            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        Ok(chunks)
    }
}
