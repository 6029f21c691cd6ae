pub mod chunking;
pub mod config;
pub mod embedding;
pub mod registry;
pub mod vector_store;

pub use chunking::{ParagraphChunker, TextSplitterChunker};
pub use config::{AppConfig, ChunkerKind, ConfigError, IndexBackend, IndexConfig};
pub use embedding::{EmbeddingProviderKind, TextEmbedding};
pub use registry::IndexRegistry;
pub use vector_store::{InMemoryIndex, QdrantIndex};
