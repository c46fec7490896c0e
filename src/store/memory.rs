//! In-memory store for tests and local development.
//!
//! [`MemoryStore`] keeps collection state in a map and answers the same way
//! the real store would at the points callers depend on: duplicate creates
//! are rejected, loading requires an index, searching requires a loaded
//! collection, and inserts are validated against the schema. Search is
//! brute-force cosine similarity.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{
    CollectionSpec, Document, FieldKind, IndexDescriptor, IndexSpec, SearchHit, SearchRequest,
    VectorStore,
};

// Rejection codes mirroring the real store where one exists.
const COLLECTION_NOT_FOUND: i64 = 100;
const COLLECTION_NOT_LOADED: i64 = 101;
const INDEX_NOT_FOUND: i64 = 700;
const INVALID_ARGUMENT: i64 = 1100;
const ALREADY_EXISTS: i64 = 65535;

struct CollectionState {
    spec: CollectionSpec,
    index: Option<IndexSpec>,
    loaded: bool,
    rows: Vec<Document>,
}

/// In-process [`VectorStore`] backend.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<(String, String), CollectionState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(database: &str, collection: &str) -> (String, String) {
        (database.to_string(), collection.to_string())
    }

    fn not_found(op: &'static str, database: &str, collection: &str) -> StoreError {
        StoreError::rejected(
            op,
            COLLECTION_NOT_FOUND,
            format!("collection not found[database={database}][collection={collection}]"),
        )
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }

    /// Validate one document against the collection schema.
    fn check_document(spec: &CollectionSpec, document: &Document) -> Result<(), StoreError> {
        for field in &spec.fields {
            match (&field.kind, field.name.as_str()) {
                (FieldKind::FloatVector { dim }, _) => {
                    if document.embedding.len() != *dim {
                        return Err(StoreError::rejected(
                            "insert",
                            INVALID_ARGUMENT,
                            format!(
                                "vector width {} does not match field '{}' dim {dim}",
                                document.embedding.len(),
                                field.name
                            ),
                        ));
                    }
                }
                (FieldKind::VarChar { max_length }, name) => {
                    let value = match name {
                        "doc_id" => &document.doc_id,
                        "content" => &document.content,
                        _ => continue,
                    };
                    if value.chars().count() > *max_length as usize {
                        return Err(StoreError::rejected(
                            "insert",
                            INVALID_ARGUMENT,
                            format!("field '{name}' exceeds max_length {max_length}"),
                        ));
                    }
                }
                (FieldKind::Json, _) => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn has_collection(&self, database: &str, collection: &str) -> Result<bool, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.contains_key(&Self::key(database, collection)))
    }

    async fn create_collection(
        &self,
        database: &str,
        collection: &str,
        spec: &CollectionSpec,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let key = Self::key(database, collection);
        if collections.contains_key(&key) {
            return Err(StoreError::rejected(
                "create_collection",
                ALREADY_EXISTS,
                format!("collection already exists[collection={collection}]"),
            ));
        }
        collections.insert(
            key,
            CollectionState {
                spec: spec.clone(),
                index: None,
                loaded: false,
                rows: Vec::new(),
            },
        );
        debug!(database, collection, "memory store created collection");
        Ok(())
    }

    async fn describe_index(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<IndexDescriptor>, StoreError> {
        let collections = self.collections.read().await;
        let state = collections
            .get(&Self::key(database, collection))
            .ok_or_else(|| Self::not_found("describe_index", database, collection))?;
        Ok(state.index.as_ref().map(|index| IndexDescriptor {
            field: index.field.clone(),
            index_name: index.index_name.clone(),
            kind: index.kind.as_str().to_string(),
            metric: index.metric.as_str().to_string(),
            state: "Finished".to_string(),
        }))
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        spec: &IndexSpec,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let state = collections
            .get_mut(&Self::key(database, collection))
            .ok_or_else(|| Self::not_found("create_index", database, collection))?;
        if state.index.is_some() {
            return Err(StoreError::rejected(
                "create_index",
                ALREADY_EXISTS,
                format!("index already exists[indexName={}]", spec.index_name),
            ));
        }
        state.index = Some(spec.clone());
        debug!(database, collection, index = %spec.index_name, "memory store created index");
        Ok(())
    }

    async fn load_collection(&self, database: &str, collection: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let state = collections
            .get_mut(&Self::key(database, collection))
            .ok_or_else(|| Self::not_found("load_collection", database, collection))?;
        if state.index.is_none() {
            // The real store refuses to load an unindexed collection.
            return Err(StoreError::rejected(
                "load_collection",
                INDEX_NOT_FOUND,
                format!("index not found[collection={collection}]"),
            ));
        }
        state.loaded = true;
        Ok(())
    }

    async fn insert(
        &self,
        database: &str,
        collection: &str,
        documents: &[Document],
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let state = collections
            .get_mut(&Self::key(database, collection))
            .ok_or_else(|| Self::not_found("insert", database, collection))?;
        for document in documents {
            Self::check_document(&state.spec, document)?;
        }
        state.rows.extend_from_slice(documents);
        Ok(documents.len() as u64)
    }

    async fn search(
        &self,
        database: &str,
        collection: &str,
        request: SearchRequest,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let collections = self.collections.read().await;
        let state = collections
            .get(&Self::key(database, collection))
            .ok_or_else(|| Self::not_found("search", database, collection))?;
        if !state.loaded {
            return Err(StoreError::rejected(
                "search",
                COLLECTION_NOT_LOADED,
                format!("collection not loaded[collection={collection}]"),
            ));
        }
        if state.spec.vector_dim() != Some(request.vector.len()) {
            return Err(StoreError::rejected(
                "search",
                INVALID_ARGUMENT,
                format!("query vector width {} does not match schema", request.vector.len()),
            ));
        }

        let mut scored: Vec<(f32, &Document)> = state
            .rows
            .iter()
            .map(|row| (Self::cosine_similarity(&request.vector, &row.embedding), row))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(request.limit)
            .map(|(score, row)| SearchHit {
                doc_id: row.doc_id.clone(),
                content: row.content.clone(),
                score,
                metadata: row.metadata.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use serde_json::json;

    const DB: &str = "default";
    const COLL: &str = "documents";

    fn doc(id: &str, embedding: Vec<f32>) -> Document {
        Document {
            doc_id: id.to_string(),
            content: format!("content of {id}"),
            embedding,
            metadata: json!({ "id": id }),
        }
    }

    async fn provisioned(dim: usize) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_collection(DB, COLL, &schema::document_collection(dim))
            .await
            .unwrap();
        store
            .create_index(DB, COLL, &schema::embedding_index())
            .await
            .unwrap();
        store.load_collection(DB, COLL).await.unwrap();
        store
    }

    #[tokio::test]
    async fn collection_lifecycle() {
        let store = MemoryStore::new();
        assert!(!store.has_collection(DB, COLL).await.unwrap());

        store
            .create_collection(DB, COLL, &schema::document_collection(3))
            .await
            .unwrap();
        assert!(store.has_collection(DB, COLL).await.unwrap());

        // No index yet: typed absence, not an error.
        assert!(store.describe_index(DB, COLL).await.unwrap().is_none());

        store
            .create_index(DB, COLL, &schema::embedding_index())
            .await
            .unwrap();
        let descriptor = store.describe_index(DB, COLL).await.unwrap().unwrap();
        assert_eq!(descriptor.field, "embedding");
        assert_eq!(descriptor.kind, "FLAT");
        assert_eq!(descriptor.metric, "COSINE");

        store.load_collection(DB, COLL).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryStore::new();
        let spec = schema::document_collection(3);
        store.create_collection(DB, COLL, &spec).await.unwrap();
        let err = store.create_collection(DB, COLL, &spec).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { code: 65535, .. }));
    }

    #[tokio::test]
    async fn load_requires_an_index() {
        let store = MemoryStore::new();
        store
            .create_collection(DB, COLL, &schema::document_collection(3))
            .await
            .unwrap();
        let err = store.load_collection(DB, COLL).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { code: 700, .. }));
    }

    #[tokio::test]
    async fn search_requires_load() {
        let store = MemoryStore::new();
        store
            .create_collection(DB, COLL, &schema::document_collection(3))
            .await
            .unwrap();
        store
            .create_index(DB, COLL, &schema::embedding_index())
            .await
            .unwrap();

        let err = store
            .search(
                DB,
                COLL,
                SearchRequest {
                    vector: vec![1.0, 0.0, 0.0],
                    limit: 5,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { code: 101, .. }));
    }

    #[tokio::test]
    async fn insert_validates_vector_width() {
        let store = provisioned(3).await;
        let err = store
            .insert(DB, COLL, &[doc("a", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { code: 1100, .. }));
    }

    #[tokio::test]
    async fn insert_validates_content_length() {
        let store = provisioned(3).await;
        let mut long = doc("a", vec![1.0, 0.0, 0.0]);
        long.content = "x".repeat(8193);
        let err = store.insert(DB, COLL, &[long]).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { code: 1100, .. }));
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let store = provisioned(3).await;
        store
            .insert(
                DB,
                COLL,
                &[
                    doc("x", vec![1.0, 0.0, 0.0]),
                    doc("y", vec![0.0, 1.0, 0.0]),
                    doc("z", vec![0.7, 0.7, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .search(
                DB,
                COLL,
                SearchRequest {
                    vector: vec![1.0, 0.0, 0.0],
                    limit: 2,
                },
            )
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc_id, "x");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].doc_id, "z");
        assert_eq!(hits[0].metadata["id"], "x");
    }

    #[tokio::test]
    async fn operations_on_missing_collection_are_rejected() {
        let store = MemoryStore::new();
        let err = store.describe_index(DB, "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { code: 100, .. }));
        let err = store
            .insert(DB, "nope", &[doc("a", vec![0.0; 3])])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { code: 100, .. }));
    }

    #[test]
    fn cosine_similarity_basics() {
        let sim = MemoryStore::cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]);
        assert!((sim - 1.0).abs() < 1e-6);
        let sim = MemoryStore::cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
        let sim = MemoryStore::cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }
}
