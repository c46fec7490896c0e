//! Environment-driven configuration.
//!
//! Every knob has a default good enough for local development; a `.env`
//! file or real environment variables override them. `from_env` fails on
//! values that parse but make no sense (zero widths, unknown backends)
//! so misconfiguration surfaces at startup, not at first request.

use anyhow::{bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Milvus,
    Memory,
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    Local,
    Hash,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    pub embedder: EmbedderKind,
    pub milvus: MilvusConfig,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Clone)]
pub struct MilvusConfig {
    pub url: String,
    /// Bearer token, e.g. `root:Milvus` or an API key. Absent means no auth.
    pub token: Option<String>,
    pub database: String,
    pub collection: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Directory holding the ONNX model and tokenizer files.
    pub model_dir: PathBuf,
    /// Token window per chunk when splitting long documents.
    pub max_tokens: usize,
    /// Vector width of the hash embedder.
    pub hash_dim: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pick = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let bind_addr: SocketAddr = pick("DOCSEARCH_BIND_ADDR", "0.0.0.0:3000")
            .parse()
            .context("DOCSEARCH_BIND_ADDR must be a socket address like 0.0.0.0:3000")?;

        let store = match pick("DOCSEARCH_STORE", "milvus").as_str() {
            "milvus" => StoreBackend::Milvus,
            "memory" => StoreBackend::Memory,
            other => bail!("DOCSEARCH_STORE must be 'milvus' or 'memory', got '{other}'"),
        };

        let embedder = match pick("DOCSEARCH_EMBEDDER", "local").as_str() {
            "local" => EmbedderKind::Local,
            "hash" => EmbedderKind::Hash,
            other => bail!("DOCSEARCH_EMBEDDER must be 'local' or 'hash', got '{other}'"),
        };

        let timeout_secs: u64 = pick("MILVUS_TIMEOUT_SECS", "30")
            .parse()
            .context("MILVUS_TIMEOUT_SECS must be a whole number of seconds")?;
        if timeout_secs == 0 {
            bail!("MILVUS_TIMEOUT_SECS must be positive");
        }

        let milvus = MilvusConfig {
            url: pick("MILVUS_URL", "http://localhost:19530"),
            token: get("MILVUS_TOKEN").filter(|token| !token.is_empty()),
            database: pick("MILVUS_DATABASE", "default"),
            collection: pick("MILVUS_COLLECTION", "documents"),
            timeout: Duration::from_secs(timeout_secs),
        };

        let max_tokens: usize = pick("EMBEDDING_MAX_TOKENS", "256")
            .parse()
            .context("EMBEDDING_MAX_TOKENS must be a positive integer")?;
        if max_tokens == 0 {
            bail!("EMBEDDING_MAX_TOKENS must be positive");
        }

        let hash_dim: usize = pick("HASH_EMBEDDER_DIM", "384")
            .parse()
            .context("HASH_EMBEDDER_DIM must be a positive integer")?;
        if hash_dim == 0 {
            bail!("HASH_EMBEDDER_DIM must be positive");
        }

        let embedding = EmbeddingConfig {
            model_dir: PathBuf::from(pick("EMBEDDING_MODEL_DIR", "all-MiniLM-L6-v2")),
            max_tokens,
            hash_dim,
        };

        Ok(Self {
            bind_addr,
            store,
            embedder,
            milvus,
            embedding,
        })
    }
}
