//! Vector-store client interface and backends.
//!
//! The service talks to its vector store exclusively through the
//! [`VectorStore`] trait: collection lifecycle (existence check, creation,
//! index creation, load) plus document insert and similarity search. Two
//! backends implement it:
//!
//! - [`MilvusStore`]: the real store, over the Milvus RESTful v2 API.
//! - [`MemoryStore`]: in-process backend for tests and local development.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub mod memory;
pub mod milvus;

pub use memory::MemoryStore;
pub use milvus::MilvusStore;

/// The kind of a collection field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Variable-length string with a maximum character count.
    VarChar { max_length: u32 },
    /// Dense float vector of fixed width.
    FloatVector { dim: usize },
    /// Schemaless JSON document.
    Json,
}

/// One field of a collection schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    pub primary: bool,
}

impl FieldSchema {
    /// A varchar field with the given maximum length.
    pub fn varchar(name: impl Into<String>, max_length: u32) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::VarChar { max_length },
            primary: false,
        }
    }

    /// A float-vector field of the given width.
    pub fn float_vector(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::FloatVector { dim },
            primary: false,
        }
    }

    /// A JSON field.
    pub fn json(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Json,
            primary: false,
        }
    }

    /// Mark this field as the primary key.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Everything needed to create a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub description: String,
    pub shard_num: u32,
    pub fields: Vec<FieldSchema>,
}

impl CollectionSpec {
    /// Width of the first vector field, if any.
    pub fn vector_dim(&self) -> Option<usize> {
        self.fields.iter().find_map(|f| match f.kind {
            FieldKind::FloatVector { dim } => Some(dim),
            _ => None,
        })
    }

    /// The primary-key field, if any.
    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.primary)
    }
}

/// Vector index kinds this service knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Exhaustive scan, exact results.
    Flat,
    /// Graph-based approximate index.
    Hnsw,
}

impl IndexKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::Flat => "FLAT",
            IndexKind::Hnsw => "HNSW",
        }
    }
}

/// Similarity metric for the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Cosine,
    L2,
    InnerProduct,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Cosine => "COSINE",
            MetricKind::L2 => "L2",
            MetricKind::InnerProduct => "IP",
        }
    }
}

/// Graph-construction tuning, sent with every create-index request.
///
/// Flat indexes ignore these; they are kept as configuration so switching the
/// index kind to a graph variant needs no other change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphBuildParams {
    pub m: u32,
    pub ef_construction: u32,
}

/// Everything needed to create an index on a vector field.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub field: String,
    pub index_name: String,
    pub kind: IndexKind,
    pub metric: MetricKind,
    pub graph: GraphBuildParams,
}

/// What the store reports about an existing index.
///
/// Kind/metric/state are kept as the server's raw strings; callers only log
/// them and must not choke on values a newer server may emit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexDescriptor {
    pub field: String,
    pub index_name: String,
    pub kind: String,
    pub metric: String,
    pub state: String,
}

/// A document row as stored in the collection.
///
/// Field names match the collection schema, so the struct serializes directly
/// into an insert payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Similarity search input.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub limit: usize,
}

/// One similarity search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub content: String,
    pub score: f32,
    pub metadata: serde_json::Value,
}

/// Client interface to the vector store.
///
/// `describe_index` answers absence with `Ok(None)`; `Err` always means the
/// call itself failed (transport, auth, server error) and is never used to
/// signal "no index". Callers rely on that distinction at startup.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Whether the collection exists in the database namespace.
    async fn has_collection(&self, database: &str, collection: &str) -> Result<bool, StoreError>;

    /// Create a collection with the given schema.
    async fn create_collection(
        &self,
        database: &str,
        collection: &str,
        spec: &CollectionSpec,
    ) -> Result<(), StoreError>;

    /// Describe the index on the collection's vector field, if one exists.
    async fn describe_index(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<IndexDescriptor>, StoreError>;

    /// Create an index as described by the spec.
    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        spec: &IndexSpec,
    ) -> Result<(), StoreError>;

    /// Load the collection into serving-ready state.
    async fn load_collection(&self, database: &str, collection: &str) -> Result<(), StoreError>;

    /// Insert documents; returns the number of rows the store accepted.
    async fn insert(
        &self,
        database: &str,
        collection: &str,
        documents: &[Document],
    ) -> Result<u64, StoreError>;

    /// Similarity search against the vector field.
    async fn search(
        &self,
        database: &str,
        collection: &str,
        request: SearchRequest,
    ) -> Result<Vec<SearchHit>, StoreError>;
}
