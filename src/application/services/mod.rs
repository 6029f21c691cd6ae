mod vector_store;

pub use vector_store::{
    ChunkedVectorStore, StoreConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_CONTENT_LENGTH, DEFAULT_PAGE_SIZE, DEFAULT_TOP_K,
};
