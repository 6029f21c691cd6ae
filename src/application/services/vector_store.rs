use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{
    chunk_id,
    ports::{EmbeddingService, QueryOptions, SimilarityIndex, TextChunker},
    ChunkRecord, Document, DomainError, Embedding, Metadata, MetadataFilter, QueryMatch,
    RawMetadata, Result,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_TOP_K: usize = 20;
pub const DEFAULT_CHUNK_SIZE: usize = 1500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 9000;

/// Fixed limits of one store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Vector length of the index.
    pub dimension: usize,
    /// Matches fetched per round when deleting by filter.
    pub page_size: usize,
    /// Result cap for similarity search when the caller gives none.
    pub default_top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Longest chunk text that may be stored in record metadata.
    pub max_content_length: usize,
}

impl StoreConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            page_size: DEFAULT_PAGE_SIZE,
            default_top_k: DEFAULT_TOP_K,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_max_content_length(mut self, max_content_length: usize) -> Self {
        self.max_content_length = max_content_length;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(DomainError::validation("dimension must be positive"));
        }
        if self.page_size == 0 {
            return Err(DomainError::validation("page size must be positive"));
        }
        if self.default_top_k == 0 {
            return Err(DomainError::validation("default top-k must be positive"));
        }
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(DomainError::validation(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.chunk_size > self.max_content_length {
            return Err(DomainError::validation(format!(
                "chunk size {} exceeds max content length {}",
                self.chunk_size, self.max_content_length
            )));
        }
        Ok(())
    }
}

/// Document-level operations on top of a flat similarity index.
///
/// Each document is stored as records `{id}-0 .. {id}-(n-1)`, one per chunk,
/// carrying the caller's metadata plus the reserved `chunkId`, `id` and
/// `content` keys. An upsert either leaves the complete chunk set or nothing.
/// Writes to the same document id must be serialized by the caller.
pub struct ChunkedVectorStore {
    embedding: Arc<dyn EmbeddingService>,
    chunker: Arc<dyn TextChunker>,
    index: Arc<dyn SimilarityIndex>,
    config: StoreConfig,
}

impl ChunkedVectorStore {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        chunker: Arc<dyn TextChunker>,
        index: Arc<dyn SimilarityIndex>,
        config: StoreConfig,
    ) -> Result<Self> {
        config.validate()?;
        if embedding.dimension() != config.dimension {
            return Err(DomainError::validation(format!(
                "embedding model produces {} dimensions, index expects {}",
                embedding.dimension(),
                config.dimension
            )));
        }

        Ok(Self {
            embedding,
            chunker,
            index,
            config,
        })
    }

    /// Replaces every chunk of `id` with the chunks of `content`.
    ///
    /// Returns the new chunk ids in content order. On any embedding or index
    /// failure the document is rolled back to absent.
    #[instrument(skip(self, content, metadata), fields(document_id = %id))]
    pub async fn upsert(
        &self,
        id: &str,
        content: &str,
        metadata: Option<&RawMetadata>,
    ) -> Result<Vec<String>> {
        info!("Upserting document");

        let metadata = match metadata {
            Some(raw) => Metadata::validate(raw).inspect_err(|e| {
                error!(error = %e, "Invalid metadata, aborting upsert");
            })?,
            None => Metadata::new(),
        };
        let document = Document::new(id, content).with_metadata(metadata);

        // Splitting has no side effects, so oversized chunks are refused
        // before the previous version is touched.
        let chunks = self.split(&document)?;

        self.delete(id).await?;

        let mut ids = Vec::with_capacity(chunks.len());
        for (ordinal, text) in chunks.iter().enumerate() {
            let chunk_id = chunk_id(id, ordinal);

            if let Err(e) = self.write_chunk(&document, ordinal, &chunk_id, text).await {
                error!(chunk_id = %chunk_id, error = %e, "Chunk write failed, rolling back");
                self.rollback(id).await;
                return Err(e);
            }

            ids.push(chunk_id);
        }

        info!(chunks = ids.len(), "Document upserted");
        Ok(ids)
    }

    /// Removes every chunk of document `id`, returning how many went.
    #[instrument(skip(self), fields(document_id = %id))]
    pub async fn delete(&self, id: &str) -> Result<usize> {
        info!("Deleting vectors for document");
        self.delete_matching(MetadataFilter::for_document(id)).await
    }

    /// Removes every record whose metadata equals all usable keys of
    /// `metadata`. Keys with non-scalar values are dropped; a filter left
    /// empty is refused rather than clearing the index.
    #[instrument(skip(self, metadata))]
    pub async fn delete_by_metadata(&self, metadata: &RawMetadata) -> Result<usize> {
        let filter = MetadataFilter::from_raw(metadata);
        if filter.is_empty() {
            return Err(DomainError::validation(
                "metadata filter has no usable conditions",
            ));
        }

        info!(filter = ?filter, "Deleting vectors matching metadata");
        self.delete_matching(filter).await
    }

    /// First record stored under `id`, if any.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> Result<Option<ChunkRecord>> {
        let records = self.index.get_by_ids(&[id.to_string()]).await?;
        info!(found = records.len(), "Looked up record");
        Ok(records.into_iter().next())
    }

    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>> {
        let records = self.index.get_by_ids(ids).await?;
        info!(found = records.len(), "Looked up records");
        Ok(records)
    }

    /// Chunks most similar to `content`, best first.
    ///
    /// If the query cannot be embedded the result is empty rather than an
    /// error. Index failures still propagate.
    #[instrument(skip(self, content, metadata))]
    pub async fn get_similar(
        &self,
        content: &str,
        metadata: Option<&RawMetadata>,
        top_k: Option<usize>,
    ) -> Result<Vec<QueryMatch>> {
        info!("Searching for similar content");

        let query = match self.embed(content).await {
            Ok(vector) => vector,
            Err(e) => {
                error!(error = %e, "Failed to embed query");
                return Ok(Vec::new());
            }
        };

        let mut options = QueryOptions::new(top_k.unwrap_or(self.config.default_top_k));
        if let Some(raw) = metadata {
            options = options.with_filter(MetadataFilter::from_raw(raw));
        }

        let matches = self.index.query(&query, options).await?;
        info!(matches = matches.len(), "Similarity search finished");
        Ok(matches)
    }

    fn split(&self, document: &Document) -> Result<Vec<String>> {
        let chunks = self.chunker.split(
            &document.content,
            self.config.chunk_size,
            self.config.chunk_overlap,
        )?;

        let limit = self.config.max_content_length;
        if let Some((ordinal, text)) = chunks
            .iter()
            .enumerate()
            .find(|(_, text)| text.chars().count() > limit)
        {
            return Err(DomainError::validation(format!(
                "chunk {} of {} is {} characters, limit is {limit}",
                ordinal,
                document.id,
                text.chars().count()
            )));
        }

        debug!(chunks = chunks.len(), "Split content");
        Ok(chunks)
    }

    async fn write_chunk(
        &self,
        document: &Document,
        ordinal: usize,
        chunk_id: &str,
        text: &str,
    ) -> Result<()> {
        debug!(chunk_id, "Generating vector");
        let vector = self.embed(text).await?;

        let record = ChunkRecord::new(chunk_id, vector, document.chunk_metadata(ordinal, text));
        let count = self.index.upsert(vec![record]).await.map_err(|e| match e {
            DomainError::IndexWrite(_) => e,
            other => DomainError::index_write(other.to_string()),
        })?;

        if count == 0 {
            return Err(DomainError::index_write(format!(
                "index acknowledged no records for {chunk_id}"
            )));
        }

        debug!(chunk_id, "Inserted vector");
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let vector = self.embedding.embed(text).await.map_err(|e| match e {
            DomainError::Embedding(_) => e,
            other => DomainError::embedding(other.to_string()),
        })?;

        if vector.dimension() != self.config.dimension {
            return Err(DomainError::embedding(format!(
                "provider returned {} dimensions, index expects {}",
                vector.dimension(),
                self.config.dimension
            )));
        }

        Ok(vector)
    }

    async fn rollback(&self, id: &str) {
        match self.delete(id).await {
            Ok(deleted) => warn!(document_id = %id, deleted, "Rolled back document"),
            Err(e) => error!(document_id = %id, error = %e, "Rollback failed"),
        }
    }

    /// Query-then-delete until the index runs dry.
    ///
    /// A page shorter than `page_size` is taken to mean nothing else
    /// matches. Concurrent writers can break that assumption, in which case
    /// some records survive and a later call picks them up.
    async fn delete_matching(&self, filter: MetadataFilter) -> Result<usize> {
        let zero = Embedding::zeros(self.config.dimension);
        let page_size = self.config.page_size;
        let mut deleted = 0;
        let mut rounds = 0;

        loop {
            rounds += 1;
            let options = QueryOptions::new(page_size)
                .with_filter(filter.clone())
                .without_metadata();
            let ids: Vec<String> = self
                .index
                .query(&zero, options)
                .await?
                .into_iter()
                .map(|m| m.id)
                .collect();

            if ids.is_empty() {
                break;
            }

            let removed = self.index.delete_by_ids(&ids).await?;
            deleted += removed;

            if ids.len() < page_size {
                break;
            }
            if removed == 0 {
                warn!(matched = ids.len(), "Index removed nothing from a full page, stopping");
                break;
            }
        }

        debug!(deleted, rounds, "Bulk delete finished");
        Ok(deleted)
    }
}
