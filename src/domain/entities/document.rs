use serde::{Deserialize, Serialize};

use super::metadata::{Metadata, CHUNK_ID_KEY, CONTENT_KEY, DOCUMENT_ID_KEY};
use super::Embedding;

/// A caller's logical document. Never stored as such; it only exists as
/// the union of its chunk records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Metadata for the chunk at `ordinal`. Reserved keys overwrite any
    /// caller key of the same name.
    pub fn chunk_metadata(&self, ordinal: usize, content: &str) -> Metadata {
        self.metadata
            .clone()
            .with(CHUNK_ID_KEY, chunk_id(&self.id, ordinal))
            .with(DOCUMENT_ID_KEY, self.id.as_str())
            .with(CONTENT_KEY, content)
    }
}

/// Id of the chunk at `ordinal` (zero-based) within `document_id`.
pub fn chunk_id(document_id: &str, ordinal: usize) -> String {
    format!("{document_id}-{ordinal}")
}

/// A flat record as the similarity index stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub vector: Embedding,
    pub metadata: Metadata,
}

impl ChunkRecord {
    pub fn new(id: impl Into<String>, vector: Embedding, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata,
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get_str(DOCUMENT_ID_KEY)
    }

    pub fn content(&self) -> Option<&str> {
        self.metadata.get_str(CONTENT_KEY)
    }
}

/// One ranked hit of a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ids_follow_ordinals() {
        assert_eq!(chunk_id("doc1", 0), "doc1-0");
        assert_eq!(chunk_id("doc1", 12), "doc1-12");
    }

    #[test]
    fn test_reserved_keys_take_precedence() {
        let doc = Document::new("doc1", "full text").with_metadata(
            Metadata::new()
                .with("id", "spoofed")
                .with("content", "spoofed")
                .with("chunkId", "spoofed")
                .with("folder", "inbox"),
        );

        let metadata = doc.chunk_metadata(1, "second piece");

        assert_eq!(metadata.get_str("id"), Some("doc1"));
        assert_eq!(metadata.get_str("chunkId"), Some("doc1-1"));
        assert_eq!(metadata.get_str("content"), Some("second piece"));
        assert_eq!(metadata.get_str("folder"), Some("inbox"));
    }
}
