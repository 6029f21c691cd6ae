use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, vectors_output::VectorsOptions, Condition,
    CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, GetPointsBuilder, PointId,
    PointStruct, PointsIdsList, Range, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder, VectorsOutput,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    ports::{QueryOptions, SimilarityIndex},
    ChunkRecord, DomainError, Embedding, Metadata, MetadataFilter, MetadataValue, QueryMatch,
    CHUNK_ID_KEY,
};

pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    pub async fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .map_err(|e| DomainError::external(e.to_string()))?;

        let index = Self {
            client,
            collection: collection.to_string(),
            dimension,
        };

        index.ensure_collection().await?;

        Ok(index)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| DomainError::external(e.to_string()))?;

            tracing::info!(
                collection = %self.collection,
                dimension = self.dimension,
                "Created Qdrant collection"
            );
        }

        Ok(())
    }
}

/// Qdrant only accepts integer or UUID point ids, so record ids are hashed
/// into a UUID v5. The record id travels in the `chunkId` payload field.
fn point_id(id: &str) -> PointId {
    PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string())
}

fn point_id_string(id: Option<PointId>) -> Option<String> {
    match id?.point_id_options? {
        PointIdOptions::Num(n) => Some(n.to_string()),
        PointIdOptions::Uuid(s) => Some(s),
    }
}

fn to_qdrant_value(value: &MetadataValue) -> QdrantValue {
    match value {
        MetadataValue::Null => QdrantValue {
            kind: Some(Kind::NullValue(0)),
        },
        MetadataValue::Bool(b) => QdrantValue::from(*b),
        MetadataValue::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => QdrantValue::from(i),
            (None, Some(f)) => QdrantValue::from(f),
            (None, None) => QdrantValue::from(n.to_string()),
        },
        MetadataValue::String(s) => QdrantValue::from(s.clone()),
    }
}

fn from_qdrant_value(value: QdrantValue) -> Option<MetadataValue> {
    match value.kind? {
        Kind::NullValue(_) => Some(MetadataValue::Null),
        Kind::BoolValue(b) => Some(MetadataValue::Bool(b)),
        Kind::IntegerValue(i) => Some(MetadataValue::from(i)),
        Kind::DoubleValue(f) => Some(MetadataValue::from(f)),
        Kind::StringValue(s) => Some(MetadataValue::String(s)),
        Kind::ListValue(_) | Kind::StructValue(_) => None,
    }
}

fn to_payload(record: &ChunkRecord) -> HashMap<String, QdrantValue> {
    let mut payload: HashMap<String, QdrantValue> = record
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), to_qdrant_value(v)))
        .collect();
    payload
        .entry(CHUNK_ID_KEY.to_string())
        .or_insert_with(|| QdrantValue::from(record.id.clone()));
    payload
}

fn from_payload(payload: HashMap<String, QdrantValue>) -> Metadata {
    payload
        .into_iter()
        .filter_map(|(k, v)| from_qdrant_value(v).map(|v| (k, v)))
        .collect()
}

/// Record id from the payload, falling back to the raw point id.
fn record_id(metadata: &Metadata, id: Option<PointId>) -> String {
    metadata
        .get_str(CHUNK_ID_KEY)
        .map(str::to_string)
        .or_else(|| point_id_string(id))
        .unwrap_or_default()
}

fn extract_vector(vectors: Option<VectorsOutput>) -> Option<Vec<f32>> {
    vectors.and_then(|v| match v.vectors_options {
        #[allow(deprecated)]
        Some(VectorsOptions::Vector(vec)) => Some(vec.data),
        _ => None,
    })
}

fn to_filter(filter: &MetadataFilter) -> Option<Filter> {
    let conditions: Vec<Condition> = filter
        .iter()
        .map(|(key, value)| match value {
            MetadataValue::Null => Condition::is_null(key.clone()),
            MetadataValue::Bool(b) => Condition::matches(key.clone(), *b),
            MetadataValue::String(s) => Condition::matches(key.clone(), s.clone()),
            // A closed range matches integer and double payloads alike, so
            // `2` finds a stored `2.0`.
            MetadataValue::Number(n) => {
                let f = n.as_f64().unwrap_or(f64::NAN);
                Condition::range(
                    key.clone(),
                    Range {
                        gte: Some(f),
                        lte: Some(f),
                        ..Default::default()
                    },
                )
            }
        })
        .collect();

    if conditions.is_empty() {
        None
    } else {
        Some(Filter::must(conditions))
    }
}

#[async_trait]
impl SimilarityIndex for QdrantIndex {
    async fn upsert(&self, records: Vec<ChunkRecord>) -> Result<usize, DomainError> {
        let points: Vec<PointStruct> = records
            .iter()
            .map(|record| {
                PointStruct::new(
                    point_id(&record.id),
                    record.vector.as_slice().to_vec(),
                    to_payload(record),
                )
            })
            .collect();
        let count = points.len();

        let response = self
            .client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| DomainError::index_write(e.to_string()))?;

        Ok(if response.result.is_some() { count } else { 0 })
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<ChunkRecord>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| point_id(id)).collect();
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, point_ids)
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| DomainError::index_read(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let metadata = from_payload(point.payload);
                let id = record_id(&metadata, point.id);
                let vector = extract_vector(point.vectors).unwrap_or_default();
                ChunkRecord::new(id, Embedding::new(vector), metadata)
            })
            .collect())
    }

    async fn query(
        &self,
        vector: &Embedding,
        options: QueryOptions,
    ) -> Result<Vec<QueryMatch>, DomainError> {
        // Payload is always fetched: the record id lives in it.
        let mut search = SearchPointsBuilder::new(
            &self.collection,
            vector.as_slice().to_vec(),
            options.top_k as u64,
        )
        .with_payload(true);

        if let Some(filter) = to_filter(&options.filter) {
            search = search.filter(filter);
        }

        let response = self
            .client
            .search_points(search)
            .await
            .map_err(|e| DomainError::index_read(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let metadata = from_payload(point.payload);
                QueryMatch {
                    id: record_id(&metadata, point.id),
                    score: point.score,
                    metadata: if options.return_metadata {
                        metadata
                    } else {
                        Metadata::new()
                    },
                }
            })
            .collect())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, DomainError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let response = self
            .client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(PointsIdsList {
                        ids: ids.iter().map(|id| point_id(id)).collect(),
                    })
                    .wait(true),
            )
            .await
            .map_err(|e| DomainError::index_write(e.to_string()))?;

        // Qdrant does not report how many of the ids existed.
        Ok(if response.result.is_some() { ids.len() } else { 0 })
    }
}
