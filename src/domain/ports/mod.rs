mod chunker;
mod embedding;
mod similarity_index;

pub use chunker::TextChunker;
pub use embedding::EmbeddingService;
pub use similarity_index::{QueryOptions, SimilarityIndex};
