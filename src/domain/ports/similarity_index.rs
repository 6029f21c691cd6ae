use crate::domain::{errors::DomainError, ChunkRecord, Embedding, MetadataFilter, QueryMatch};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub filter: MetadataFilter,
    pub top_k: usize,
    pub return_metadata: bool,
}

impl QueryOptions {
    pub fn new(top_k: usize) -> Self {
        Self {
            filter: MetadataFilter::new(),
            top_k,
            return_metadata: true,
        }
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn without_metadata(mut self) -> Self {
        self.return_metadata = false;
        self
    }
}

/// Flat `{id, vector, metadata}` storage answering nearest-neighbour
/// queries. There is no delete-by-filter; callers discover ids via `query`.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Returns the number of records the index acknowledged.
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<usize, DomainError>;
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>, DomainError>;
    /// Matches ranked by descending similarity.
    async fn query(
        &self,
        vector: &Embedding,
        options: QueryOptions,
    ) -> Result<Vec<QueryMatch>, DomainError>;
    /// Returns the number of records removed.
    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, DomainError>;
}
