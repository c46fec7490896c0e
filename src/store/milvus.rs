//! Milvus backend over the RESTful v2 API.
//!
//! Every operation is a POST of a JSON body to `/v2/vectordb/...`, answered
//! by an envelope `{code, message, data}` where `code == 0` means success.
//! The gRPC SDK surface is deliberately not used; the REST surface covers
//! every operation this service consumes.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::StoreError;
use crate::schema::{CONTENT_FIELD, DOC_ID_FIELD, EMBEDDING_FIELD, METADATA_FIELD};
use crate::store::{
    CollectionSpec, Document, FieldKind, FieldSchema, IndexDescriptor, IndexSpec, SearchHit,
    SearchRequest, VectorStore,
};

const COLLECTIONS_HAS: &str = "/v2/vectordb/collections/has";
const COLLECTIONS_CREATE: &str = "/v2/vectordb/collections/create";
const COLLECTIONS_LOAD: &str = "/v2/vectordb/collections/load";
const INDEXES_LIST: &str = "/v2/vectordb/indexes/list";
const INDEXES_DESCRIBE: &str = "/v2/vectordb/indexes/describe";
const INDEXES_CREATE: &str = "/v2/vectordb/indexes/create";
const ENTITIES_INSERT: &str = "/v2/vectordb/entities/insert";
const ENTITIES_SEARCH: &str = "/v2/vectordb/entities/search";

/// Server code for "index not found" on describe.
const INDEX_NOT_FOUND_CODE: i64 = 700;

/// Response envelope shared by all v2 endpoints.
///
/// `code` is required on purpose: a body without it is not a Milvus answer
/// and must surface as an invalid response, not as silent success.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

/// Milvus-backed [`VectorStore`].
pub struct MilvusStore {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl MilvusStore {
    /// Build a client for the given REST endpoint.
    ///
    /// `token` is the `user:password` (or API key) bearer token; `None`
    /// disables the Authorization header entirely.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = normalize_base_url(&base_url.into())?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    async fn call(&self, op: &'static str, path: &str, body: Value) -> Result<Envelope, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(op, %url, "calling milvus");

        let mut request = self.http.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable body".to_string());
            return Err(StoreError::rejected(op, i64::from(status.as_u16()), text));
        }

        response
            .json::<Envelope>()
            .await
            .map_err(|e| StoreError::invalid(op, e.to_string()))
    }

    /// Run a call and unwrap the envelope, treating any non-zero code as a
    /// rejection.
    async fn call_ok(&self, op: &'static str, path: &str, body: Value) -> Result<Value, StoreError> {
        let envelope = self.call(op, path, body).await?;
        if envelope.code != 0 {
            return Err(StoreError::rejected(op, envelope.code, envelope.message));
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl VectorStore for MilvusStore {
    async fn has_collection(&self, database: &str, collection: &str) -> Result<bool, StoreError> {
        let body = json!({ "dbName": database, "collectionName": collection });
        let data = self.call_ok("has_collection", COLLECTIONS_HAS, body).await?;
        data.get("has")
            .and_then(Value::as_bool)
            .ok_or_else(|| StoreError::invalid("has_collection", "missing boolean `has` field"))
    }

    async fn create_collection(
        &self,
        database: &str,
        collection: &str,
        spec: &CollectionSpec,
    ) -> Result<(), StoreError> {
        let body = create_collection_body(database, collection, spec);
        self.call_ok("create_collection", COLLECTIONS_CREATE, body)
            .await?;
        Ok(())
    }

    async fn describe_index(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<IndexDescriptor>, StoreError> {
        // List first: an empty list is the common "no index yet" answer and
        // carries no error code to interpret.
        let body = json!({ "dbName": database, "collectionName": collection });
        let data = self.call_ok("list_indexes", INDEXES_LIST, body).await?;
        let names = data
            .as_array()
            .ok_or_else(|| StoreError::invalid("list_indexes", "data is not an array"))?;
        let Some(index_name) = names.first().and_then(Value::as_str) else {
            return Ok(None);
        };

        let body = json!({
            "dbName": database,
            "collectionName": collection,
            "indexName": index_name,
        });
        let envelope = self.call("describe_index", INDEXES_DESCRIBE, body).await?;
        if index_absent(envelope.code, &envelope.message) {
            // The index disappeared between list and describe.
            return Ok(None);
        }
        if envelope.code != 0 {
            return Err(StoreError::rejected(
                "describe_index",
                envelope.code,
                envelope.message,
            ));
        }

        let descriptor = envelope
            .data
            .as_array()
            .and_then(|entries| entries.first())
            .map(index_descriptor_from)
            .ok_or_else(|| StoreError::invalid("describe_index", "empty index description"))?;
        Ok(Some(descriptor))
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        spec: &IndexSpec,
    ) -> Result<(), StoreError> {
        let body = create_index_body(database, collection, spec);
        self.call_ok("create_index", INDEXES_CREATE, body).await?;
        Ok(())
    }

    async fn load_collection(&self, database: &str, collection: &str) -> Result<(), StoreError> {
        let body = json!({ "dbName": database, "collectionName": collection });
        self.call_ok("load_collection", COLLECTIONS_LOAD, body)
            .await?;
        Ok(())
    }

    async fn insert(
        &self,
        database: &str,
        collection: &str,
        documents: &[Document],
    ) -> Result<u64, StoreError> {
        let rows = serde_json::to_value(documents)
            .map_err(|e| StoreError::invalid("insert", e.to_string()))?;
        let body = json!({
            "dbName": database,
            "collectionName": collection,
            "data": rows,
        });
        let data = self.call_ok("insert", ENTITIES_INSERT, body).await?;
        Ok(data
            .get("insertCount")
            .and_then(Value::as_u64)
            .unwrap_or(documents.len() as u64))
    }

    async fn search(
        &self,
        database: &str,
        collection: &str,
        request: SearchRequest,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let body = json!({
            "dbName": database,
            "collectionName": collection,
            "data": [request.vector],
            "annsField": EMBEDDING_FIELD,
            "limit": request.limit,
            "outputFields": [DOC_ID_FIELD, CONTENT_FIELD, METADATA_FIELD],
        });
        let data = self.call_ok("search", ENTITIES_SEARCH, body).await?;
        let rows = data
            .as_array()
            .ok_or_else(|| StoreError::invalid("search", "data is not an array"))?;
        Ok(rows.iter().map(search_hit_from).collect())
    }
}

/// Strip trailing slashes and insist on an http(s) endpoint.
fn normalize_base_url(raw: &str) -> Result<String, StoreError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(StoreError::Config(format!(
            "store URL must start with http:// or https://, got '{raw}'"
        )));
    }
    Ok(trimmed.to_string())
}

/// Whether a describe-index answer means "no such index".
fn index_absent(code: i64, message: &str) -> bool {
    code == INDEX_NOT_FOUND_CODE || message.contains("index not found")
}

fn create_collection_body(database: &str, collection: &str, spec: &CollectionSpec) -> Value {
    let fields: Vec<Value> = spec.fields.iter().map(field_schema_json).collect();
    json!({
        "dbName": database,
        "collectionName": collection,
        "schema": {
            "autoId": false,
            "description": spec.description,
            "fields": fields,
        },
        "params": { "shardsNum": spec.shard_num },
    })
}

fn field_schema_json(field: &FieldSchema) -> Value {
    // Type parameters travel as strings, matching the server's param map.
    let mut value = match &field.kind {
        FieldKind::VarChar { max_length } => json!({
            "fieldName": field.name,
            "dataType": "VarChar",
            "elementTypeParams": { "max_length": max_length.to_string() },
        }),
        FieldKind::FloatVector { dim } => json!({
            "fieldName": field.name,
            "dataType": "FloatVector",
            "elementTypeParams": { "dim": dim.to_string() },
        }),
        FieldKind::Json => json!({
            "fieldName": field.name,
            "dataType": "JSON",
        }),
    };
    if field.primary {
        value["isPrimary"] = json!(true);
    }
    value
}

fn create_index_body(database: &str, collection: &str, spec: &IndexSpec) -> Value {
    json!({
        "dbName": database,
        "collectionName": collection,
        "indexParams": [{
            "fieldName": spec.field,
            "indexName": spec.index_name,
            "metricType": spec.metric.as_str(),
            "params": {
                "index_type": spec.kind.as_str(),
                "M": spec.graph.m,
                "efConstruction": spec.graph.ef_construction,
            },
        }],
    })
}

fn index_descriptor_from(value: &Value) -> IndexDescriptor {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    IndexDescriptor {
        field: text("fieldName"),
        index_name: text("indexName"),
        kind: text("indexType"),
        metric: text("metricType"),
        state: text("indexState"),
    }
}

fn search_hit_from(row: &Value) -> SearchHit {
    SearchHit {
        doc_id: row
            .get(DOC_ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content: row
            .get(CONTENT_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        score: row
            .get("distance")
            .and_then(Value::as_f64)
            .unwrap_or_default() as f32,
        metadata: row.get(METADATA_FIELD).cloned().unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url("http://localhost:19530/").unwrap(),
            "http://localhost:19530"
        );
        assert_eq!(
            normalize_base_url("https://milvus.internal:19530///").unwrap(),
            "https://milvus.internal:19530"
        );
        assert!(normalize_base_url("localhost:19530").is_err());
    }

    #[test]
    fn create_collection_body_carries_schema_and_shards() {
        let spec = schema::document_collection(384);
        let body = create_collection_body("default", "documents", &spec);

        assert_eq!(body["dbName"], "default");
        assert_eq!(body["collectionName"], "documents");
        assert_eq!(body["schema"]["autoId"], false);
        assert_eq!(body["params"]["shardsNum"], 2);

        let fields = body["schema"]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0]["fieldName"], "doc_id");
        assert_eq!(fields[0]["dataType"], "VarChar");
        assert_eq!(fields[0]["isPrimary"], true);
        assert_eq!(fields[0]["elementTypeParams"]["max_length"], "256");
        assert_eq!(fields[1]["elementTypeParams"]["max_length"], "8192");
        assert_eq!(fields[2]["dataType"], "FloatVector");
        assert_eq!(fields[2]["elementTypeParams"]["dim"], "384");
        assert_eq!(fields[3]["dataType"], "JSON");
        // Only the primary key carries the flag.
        assert!(fields[1].get("isPrimary").is_none());
    }

    #[test]
    fn create_index_body_carries_kind_metric_and_extras() {
        let spec = schema::embedding_index();
        let body = create_index_body("default", "documents", &spec);

        let param = &body["indexParams"][0];
        assert_eq!(param["fieldName"], "embedding");
        assert_eq!(param["indexName"], "embedding");
        assert_eq!(param["metricType"], "COSINE");
        assert_eq!(param["params"]["index_type"], "FLAT");
        assert_eq!(param["params"]["M"], 16);
        assert_eq!(param["params"]["efConstruction"], 100);
    }

    #[test]
    fn absence_classification() {
        assert!(index_absent(700, "index not found[indexName=embedding]"));
        assert!(index_absent(65535, "index not found[collection=documents]"));
        assert!(!index_absent(0, ""));
        assert!(!index_absent(1100, "connection refused"));
        assert!(!index_absent(1800, "permission denied"));
    }

    #[test]
    fn descriptor_parses_from_server_row() {
        let row = json!({
            "fieldName": "embedding",
            "indexName": "embedding",
            "indexType": "FLAT",
            "metricType": "COSINE",
            "indexState": "Finished",
            "totalRows": 0,
        });
        let descriptor = index_descriptor_from(&row);
        assert_eq!(descriptor.field, "embedding");
        assert_eq!(descriptor.kind, "FLAT");
        assert_eq!(descriptor.metric, "COSINE");
        assert_eq!(descriptor.state, "Finished");
    }

    #[test]
    fn search_hit_parses_distance_and_metadata() {
        let row = json!({
            "doc_id": "abc",
            "content": "hello",
            "distance": 0.87,
            "metadata": { "source": "test" },
        });
        let hit = search_hit_from(&row);
        assert_eq!(hit.doc_id, "abc");
        assert_eq!(hit.content, "hello");
        assert!((hit.score - 0.87).abs() < 1e-6);
        assert_eq!(hit.metadata["source"], "test");
    }

    #[test]
    fn envelope_requires_code() {
        let ok: Envelope = serde_json::from_str(r#"{"code":0,"data":{"has":true}}"#).unwrap();
        assert_eq!(ok.code, 0);
        assert_eq!(ok.data["has"], true);

        let err: Envelope =
            serde_json::from_str(r#"{"code":700,"message":"index not found"}"#).unwrap();
        assert_eq!(err.code, 700);
        assert_eq!(err.message, "index not found");

        assert!(serde_json::from_str::<Envelope>(r#"{"data":{}}"#).is_err());
    }
}
