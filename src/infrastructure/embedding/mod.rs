mod text;

pub use text::{EmbeddingProviderKind, TextEmbedding};
