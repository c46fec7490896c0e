//! End-to-end flow over HTTP against the in-memory backend.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};

use docsearch::bootstrap::StoreInitializer;
use docsearch::embedding::HashEmbedder;
use docsearch::service::{self, AppState};
use docsearch::store::MemoryStore;

const DB: &str = "default";
const COLL: &str = "documents";

async fn spawn_service() -> SocketAddr {
    let store = Arc::new(MemoryStore::new());
    let embedder = Arc::new(HashEmbedder::new(32));
    StoreInitializer::new(store.clone(), embedder.clone(), DB, COLL)
        .run()
        .await
        .expect("provisioning should succeed on a fresh store");

    let state = Arc::new(AppState {
        store,
        embedder,
        database: DB.to_string(),
        collection: COLL.to_string(),
    });
    let app = service::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn ingest_and_search_over_http() {
    let addr = spawn_service().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let corpus = [
        ("rust borrow checker rules", "handbook"),
        ("tokio async runtime internals", "blog"),
        ("sourdough starter maintenance", "cookbook"),
    ];
    for (content, source) in corpus {
        let response = client
            .post(format!("{base}/documents"))
            .json(&json!({ "content": content, "metadata": { "source": source } }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert!(body["doc_id"].as_str().is_some());
    }

    let response = client
        .post(format!("{base}/search"))
        .json(&json!({ "query": "tokio async runtime internals", "limit": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let hits: Value = response.json().await.unwrap();
    let hits = hits.as_array().unwrap();

    assert_eq!(hits.len(), 2);
    // The hash embedder is deterministic, so the exact same text wins.
    assert_eq!(hits[0]["content"], "tokio async runtime internals");
    assert_eq!(hits[0]["metadata"]["source"], "blog");
    assert!(hits[0]["score"].as_f64().unwrap() >= hits[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn explicit_doc_id_and_default_metadata_round_trip() {
    let addr = spawn_service().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let response = client
        .post(format!("{base}/documents"))
        .json(&json!({ "content": "release checklist", "doc_id": "kb-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["doc_id"], "kb-1");

    let hits: Value = client
        .post(format!("{base}/search"))
        .json(&json!({ "query": "release checklist" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hits[0]["doc_id"], "kb-1");
    assert_eq!(hits[0]["metadata"], json!({}));
}

#[tokio::test]
async fn invalid_requests_get_a_400_with_an_error_body() {
    let addr = spawn_service().await;
    let client = reqwest::Client::new();
    let base = format!("http://{addr}");

    let response = client
        .post(format!("{base}/documents"))
        .json(&json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some());

    let response = client
        .post(format!("{base}/search"))
        .json(&json!({ "query": "anything", "limit": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}
