use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::domain::{
    ports::{QueryOptions, SimilarityIndex},
    ChunkRecord, DomainError, Embedding, Metadata, QueryMatch,
};

/// Process-local similarity index with exact cosine ranking.
pub struct InMemoryIndex {
    dimension: usize,
    records: RwLock<BTreeMap<String, ChunkRecord>>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<usize, DomainError> {
        if let Some(bad) = records.iter().find(|r| r.vector.dimension() != self.dimension) {
            return Err(DomainError::index_write(format!(
                "record {} has {} dimensions, index expects {}",
                bad.id,
                bad.vector.dimension(),
                self.dimension
            )));
        }

        let mut store = self
            .records
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let count = records.len();
        for record in records {
            store.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>, DomainError> {
        let store = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }

    async fn query(
        &self,
        vector: &Embedding,
        options: QueryOptions,
    ) -> Result<Vec<QueryMatch>, DomainError> {
        if vector.dimension() != self.dimension {
            return Err(DomainError::index_read(format!(
                "query has {} dimensions, index expects {}",
                vector.dimension(),
                self.dimension
            )));
        }

        let store = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        // BTreeMap iteration is id-ordered and the sort is stable, so equal
        // scores stay ordered by id.
        let mut results: Vec<QueryMatch> = store
            .values()
            .filter(|record| options.filter.matches(&record.metadata))
            .map(|record| QueryMatch {
                id: record.id.clone(),
                score: vector.cosine_similarity(&record.vector),
                metadata: if options.return_metadata {
                    record.metadata.clone()
                } else {
                    Metadata::new()
                },
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(options.top_k);

        Ok(results)
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, DomainError> {
        let mut store = self
            .records
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(ids.iter().filter(|id| store.remove(*id).is_some()).count())
    }
}
