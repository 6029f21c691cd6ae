mod in_memory;
mod qdrant;

pub use in_memory::InMemoryIndex;
pub use qdrant::QdrantIndex;
