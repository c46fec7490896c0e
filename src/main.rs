use std::sync::Arc;

use anyhow::{Context, Result};
use dotenv::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use docsearch::bootstrap::StoreInitializer;
use docsearch::config::{AppConfig, EmbedderKind, StoreBackend};
use docsearch::embedding::{Embedder, HashEmbedder};
use docsearch::embedding_model::LocalEmbedder;
use docsearch::service::{self, AppState};
use docsearch::store::{MemoryStore, MilvusStore, VectorStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;

    let embedder: Arc<dyn Embedder> = match config.embedder {
        EmbedderKind::Local => Arc::new(
            LocalEmbedder::load(&config.embedding.model_dir, config.embedding.max_tokens)
                .context("failed to load the local embedding model")?,
        ),
        EmbedderKind::Hash => Arc::new(HashEmbedder::new(config.embedding.hash_dim)),
    };
    info!(
        model = embedder.model_name(),
        dimensions = embedder.dimensions(),
        "embedder ready"
    );

    let store: Arc<dyn VectorStore> = match config.store {
        StoreBackend::Milvus => Arc::new(MilvusStore::new(
            config.milvus.url.as_str(),
            config.milvus.token.clone(),
            config.milvus.timeout,
        )?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    // The service refuses to start against an unprovisioned store.
    let outcome = StoreInitializer::new(
        store.clone(),
        embedder.clone(),
        config.milvus.database.clone(),
        config.milvus.collection.clone(),
    )
    .run()
    .await
    .context("store provisioning failed")?;
    info!(
        created_collection = outcome.created_collection,
        created_index = outcome.created_index,
        loaded = outcome.loaded,
        "store ready"
    );

    let state = Arc::new(AppState {
        store,
        embedder,
        database: config.milvus.database,
        collection: config.milvus.collection,
    });
    let app = service::router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
