use crate::domain::errors::DomainError;

/// Splits content into ordered pieces of at most `chunk_size` characters,
/// consecutive pieces sharing up to `chunk_overlap` characters.
pub trait TextChunker: Send + Sync {
    fn split(
        &self,
        content: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<String>, DomainError>;
}
