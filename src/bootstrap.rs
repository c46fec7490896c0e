//! Idempotent store provisioning at startup.
//!
//! [`StoreInitializer::run`] brings the backing store to a ready state:
//! create the document collection if it is missing, create the vector
//! index if it is missing, and load the collection when the index was
//! just created. Every step is skipped when its work is already done, so
//! rerunning against a provisioned store changes nothing.
//!
//! Index absence is a typed `None` from the store, never an inferred one:
//! a transport or server failure while describing the index aborts the
//! run instead of being mistaken for "no index yet".

use std::sync::Arc;

use tracing::info;

use crate::embedding::Embedder;
use crate::error::StoreError;
use crate::schema;
use crate::store::VectorStore;

/// What [`StoreInitializer::run`] actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootstrapOutcome {
    pub created_collection: bool,
    pub created_index: bool,
    pub loaded: bool,
}

/// One-shot provisioning of the collection and index the service uses.
pub struct StoreInitializer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    database: String,
    collection: String,
}

impl StoreInitializer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Run the provisioning sequence. Any store failure is returned as-is
    /// and should abort startup.
    pub async fn run(&self) -> Result<BootstrapOutcome, StoreError> {
        let database = self.database.as_str();
        let collection = self.collection.as_str();
        let mut outcome = BootstrapOutcome::default();

        let dimensions = self.embedder.dimensions();
        if dimensions == 0 {
            return Err(StoreError::Config(format!(
                "embedder '{}' reports zero dimensions",
                self.embedder.model_name()
            )));
        }

        if self.store.has_collection(database, collection).await? {
            info!(database, collection, "collection already exists");
        } else {
            let spec = schema::document_collection(dimensions);
            self.store
                .create_collection(database, collection, &spec)
                .await?;
            outcome.created_collection = true;
            info!(database, collection, dimensions, "created collection");
        }

        match self.store.describe_index(database, collection).await? {
            Some(descriptor) => {
                info!(
                    database,
                    collection,
                    index = %descriptor.index_name,
                    kind = %descriptor.kind,
                    metric = %descriptor.metric,
                    "index already present"
                );
            }
            None => {
                let index = schema::embedding_index();
                self.store
                    .create_index(database, collection, &index)
                    .await?;
                outcome.created_index = true;
                info!(database, collection, index = %index.index_name, "created index");

                self.store.load_collection(database, collection).await?;
                outcome.loaded = true;
                info!(database, collection, "collection loaded");
            }
        }

        Ok(outcome)
    }
}
