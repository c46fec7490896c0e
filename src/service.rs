//! HTTP surface: ingest documents and search them.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

use crate::embedding::Embedder;
use crate::error::{EmbedError, StoreError};
use crate::schema;
use crate::store::{Document, SearchHit, SearchRequest, VectorStore};

pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Shared state behind every handler.
pub struct AppState {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub database: String,
    pub collection: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/documents", post(add_document))
        .route("/search", post(search))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct AddDocumentRequest {
    pub content: String,
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct AddDocumentResponse {
    pub doc_id: String,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Error payload returned to HTTP clients as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, message = %self.message, "request failed");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
        }
    }
}

impl From<EmbedError> for ApiError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::EmptyInput => Self::bad_request(err.to_string()),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.to_string(),
            },
        }
    }
}

async fn add_document(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddDocumentRequest>,
) -> Result<Json<AddDocumentResponse>, ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    if payload.content.chars().count() > schema::CONTENT_MAX_LENGTH as usize {
        return Err(ApiError::bad_request(format!(
            "content exceeds {} characters",
            schema::CONTENT_MAX_LENGTH
        )));
    }

    let doc_id = match payload.doc_id {
        Some(id) => {
            if id.is_empty() || id.chars().count() > schema::DOC_ID_MAX_LENGTH as usize {
                return Err(ApiError::bad_request(format!(
                    "doc_id must be 1 to {} characters",
                    schema::DOC_ID_MAX_LENGTH
                )));
            }
            id
        }
        None => Uuid::new_v4().to_string(),
    };

    let embedding = state.embedder.embed_document(&payload.content).await?;
    let document = Document {
        doc_id: doc_id.clone(),
        content: payload.content,
        embedding,
        metadata: payload.metadata.unwrap_or_else(|| json!({})),
    };

    let inserted = state
        .store
        .insert(&state.database, &state.collection, &[document])
        .await?;
    debug!(doc_id = %doc_id, inserted, "stored document");

    Ok(Json(AddDocumentResponse { doc_id }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    if payload.query.trim().is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }
    let limit = payload.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if limit == 0 || limit > MAX_SEARCH_LIMIT {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_SEARCH_LIMIT}"
        )));
    }

    let vector = state.embedder.embed_query(&payload.query).await?;
    let hits = state
        .store
        .search(
            &state.database,
            &state.collection,
            SearchRequest { vector, limit },
        )
        .await?;

    Ok(Json(hits))
}
