mod document;
mod embedding;
mod metadata;

pub use document::{chunk_id, ChunkRecord, Document, QueryMatch};
pub use embedding::Embedding;
pub use metadata::{
    Metadata, MetadataFilter, MetadataValue, RawMetadata, CHUNK_ID_KEY, CONTENT_KEY,
    DOCUMENT_ID_KEY,
};
