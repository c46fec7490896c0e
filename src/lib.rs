//! Document ingestion and vector search over a Milvus-backed store.
//!
//! On startup the service provisions its collection and vector index
//! ([`bootstrap::StoreInitializer`]), then serves document ingest and
//! similarity search over HTTP ([`service::router`]). Embeddings come
//! from a local ONNX model ([`embedding_model::LocalEmbedder`]) or a
//! deterministic hash backend for tests and smoke setups
//! ([`embedding::HashEmbedder`]).

pub mod bootstrap;
pub mod config;
pub mod embedding;
pub mod embedding_model;
pub mod error;
pub mod schema;
pub mod service;
pub mod store;
pub mod vector_mean;
