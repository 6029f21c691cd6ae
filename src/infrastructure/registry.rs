use std::collections::HashMap;
use std::sync::Arc;

use crate::application::ChunkedVectorStore;
use crate::domain::{
    ports::{SimilarityIndex, TextChunker},
    DomainError,
};
use crate::infrastructure::chunking::{ParagraphChunker, TextSplitterChunker};
use crate::infrastructure::config::{AppConfig, ChunkerKind, IndexBackend};
use crate::infrastructure::embedding::TextEmbedding;
use crate::infrastructure::vector_store::{InMemoryIndex, QdrantIndex};

impl ChunkerKind {
    pub fn build(&self) -> Arc<dyn TextChunker> {
        match self {
            Self::TextSplitter => Arc::new(TextSplitterChunker::new()),
            Self::Paragraph => Arc::new(ParagraphChunker::new()),
        }
    }
}

/// Named stores, one per configured index.
#[derive(Default)]
pub struct IndexRegistry {
    stores: HashMap<String, Arc<ChunkedVectorStore>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        let mut registry = Self::new();

        for (name, index) in &config.indexes {
            let embedding = Arc::new(TextEmbedding::connect(&index.embedding, index.dimension)?);

            let similarity: Arc<dyn SimilarityIndex> = match index.backend {
                IndexBackend::Qdrant => Arc::new(
                    QdrantIndex::new(
                        &config.qdrant.url,
                        config.qdrant.api_key.clone(),
                        &index.collection,
                        index.dimension,
                    )
                    .await?,
                ),
                IndexBackend::Memory => Arc::new(InMemoryIndex::new(index.dimension)),
            };

            let store = ChunkedVectorStore::new(
                embedding,
                index.chunker.build(),
                similarity,
                config.store.store_config(index.dimension),
            )?;

            tracing::info!(
                index = %name,
                collection = %index.collection,
                provider = index.embedding.provider.as_str(),
                model = %index.embedding.model,
                "Index ready"
            );

            registry = registry.with_store(name.clone(), Arc::new(store));
        }

        Ok(registry)
    }

    pub fn with_store(mut self, name: impl Into<String>, store: Arc<ChunkedVectorStore>) -> Self {
        self.stores.insert(name.into(), store);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<ChunkedVectorStore>, DomainError> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("index {name}")))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
