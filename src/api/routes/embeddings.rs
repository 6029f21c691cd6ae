use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{
    error::{ApiError, JsonBody},
    state::AppState,
};
use crate::application::ChunkedVectorStore;
use crate::domain::{ChunkRecord, QueryMatch, RawMetadata};

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    fn json(data: T) -> Json<Self> {
        Json(Self { data })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEmbeddingRequest {
    pub id: Option<String>,
    pub content: String,
    pub metadata: Option<RawMetadata>,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingCreated {
    pub id: String,
    pub chunks: Vec<String>,
    pub metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteByMetadataRequest {
    pub metadata: RawMetadata,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
pub struct SimilarRequest {
    pub content: String,
    pub metadata: Option<RawMetadata>,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub ids: Vec<String>,
}

fn store_for(state: &AppState, index: &str) -> Result<Arc<ChunkedVectorStore>, ApiError> {
    state
        .store(index)
        .ok_or_else(|| ApiError::unknown_index(index))
}

pub async fn create_embedding(
    State(state): State<AppState>,
    Path(index): Path<String>,
    JsonBody(request): JsonBody<CreateEmbeddingRequest>,
) -> Result<Json<DataResponse<EmbeddingCreated>>, ApiError> {
    let store = store_for(&state, &index)?;
    let id = request.id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let chunks = store
        .upsert(&id, &request.content, request.metadata.as_ref())
        .await?;

    Ok(DataResponse::json(EmbeddingCreated {
        id,
        chunks,
        metadata: request.metadata,
    }))
}

pub async fn get_embedding(
    State(state): State<AppState>,
    Path((index, id)): Path<(String, String)>,
) -> Result<Json<DataResponse<ChunkRecord>>, ApiError> {
    let store = store_for(&state, &index)?;

    match store.get_by_id(&id).await? {
        Some(record) => Ok(DataResponse::json(record)),
        None => Err(ApiError::not_found(format!("Embedding not found: {id}"))),
    }
}

pub async fn delete_embedding(
    State(state): State<AppState>,
    Path((index, id)): Path<(String, String)>,
) -> Result<Json<DataResponse<DeletedResponse>>, ApiError> {
    let store = store_for(&state, &index)?;

    let deleted = store.delete(&id).await?;
    if deleted == 0 {
        return Err(ApiError::not_found(format!("Embedding not found: {id}")));
    }

    Ok(DataResponse::json(DeletedResponse { deleted }))
}

pub async fn delete_by_metadata(
    State(state): State<AppState>,
    Path(index): Path<String>,
    JsonBody(request): JsonBody<DeleteByMetadataRequest>,
) -> Result<Json<DataResponse<DeletedResponse>>, ApiError> {
    let store = store_for(&state, &index)?;

    let deleted = store.delete_by_metadata(&request.metadata).await?;

    Ok(DataResponse::json(DeletedResponse { deleted }))
}

pub async fn search_similar(
    State(state): State<AppState>,
    Path(index): Path<String>,
    JsonBody(request): JsonBody<SimilarRequest>,
) -> Result<Json<DataResponse<Vec<QueryMatch>>>, ApiError> {
    let store = store_for(&state, &index)?;

    let matches = store
        .get_similar(&request.content, request.metadata.as_ref(), request.top_k)
        .await?;

    Ok(DataResponse::json(matches))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(index): Path<String>,
    JsonBody(request): JsonBody<BatchRequest>,
) -> Result<Json<DataResponse<Vec<ChunkRecord>>>, ApiError> {
    let store = store_for(&state, &index)?;

    let records = store.get_by_ids(&request.ids).await?;

    Ok(DataResponse::json(records))
}

#[cfg(test)]
mod tests {
    use crate::api::{create_router, AppState};
    use crate::application::{ChunkedVectorStore, StoreConfig};
    use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
    use crate::infrastructure::{AppConfig, InMemoryIndex, IndexRegistry, ParagraphChunker};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Scores text on two topics so similarity results are predictable.
    struct TopicEmbedding;

    #[async_trait]
    impl EmbeddingService for TopicEmbedding {
        async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
            let topic = |word: &str| if text.contains(word) { 1.0 } else { 0.0 };
            Ok(Embedding::new(vec![topic("rust"), topic("bread"), 0.1]))
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn app() -> Router {
        let store = ChunkedVectorStore::new(
            Arc::new(TopicEmbedding),
            Arc::new(ParagraphChunker::new()),
            Arc::new(InMemoryIndex::new(3)),
            StoreConfig::new(3).with_chunking(20, 0),
        )
        .unwrap();

        let registry = IndexRegistry::new().with_store("notes", Arc::new(store));
        create_router(AppState::new(registry, AppConfig::default()))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/notes/embeddings",
            Some(json!({
                "id": "doc1",
                "content": "rust ownership\n\nbread baking",
                "metadata": { "tag": "mixed" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], "doc1");
        assert_eq!(body["data"]["chunks"], json!(["doc1-0", "doc1-1"]));
        assert_eq!(body["data"]["metadata"]["tag"], "mixed");

        let (status, body) = send(&app, "GET", "/api/v1/notes/embeddings/doc1-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], "doc1-1");
        assert_eq!(body["data"]["metadata"]["content"], "bread baking");
        assert_eq!(body["data"]["metadata"]["id"], "doc1");
        assert_eq!(body["data"]["metadata"]["tag"], "mixed");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/notes/embeddings/similar",
            Some(json!({ "content": "rust", "top_k": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["id"], "doc1-0");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/notes/embeddings/batch",
            Some(json!({ "ids": ["doc1-0", "doc1-7", "doc1-1"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, body) = send(&app, "DELETE", "/api/v1/notes/embeddings/doc1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], 2);

        let (status, body) = send(&app, "DELETE", "/api/v1/notes/embeddings/doc1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, "GET", "/api/v1/notes/embeddings/doc1-0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generates_id_when_missing() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/notes/embeddings",
            Some(json!({ "content": "rust" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let id = body["data"]["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(body["data"]["chunks"], json!([format!("{id}-0")]));
    }

    #[tokio::test]
    async fn test_unknown_index_is_bad_request() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/recipes/embeddings",
            Some(json!({ "id": "doc1", "content": "bread" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid index name: recipes");
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let app = app();

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/notes/embeddings")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/notes/embeddings",
            Some(json!({ "id": "doc1" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("content"));
    }

    #[tokio::test]
    async fn test_nested_metadata_is_bad_request() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/notes/embeddings",
            Some(json!({
                "id": "doc1",
                "content": "rust",
                "metadata": { "tags": ["a", "b"] }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("tags"));

        let (status, _) = send(&app, "GET", "/api/v1/notes/embeddings/doc1-0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_by_metadata() {
        let app = app();

        for (id, tag) in [("a", "keep"), ("b", "drop"), ("c", "drop")] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/v1/notes/embeddings",
                Some(json!({ "id": id, "content": "bread", "metadata": { "tag": tag } })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/notes/embeddings/delete_by_metadata",
            Some(json!({ "metadata": { "tag": "drop" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], 2);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/notes/embeddings/delete_by_metadata",
            Some(json!({ "metadata": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, "GET", "/api/v1/notes/embeddings/a-0", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
