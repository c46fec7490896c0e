//! The document collection schema and its index parameters.
//!
//! One collection shape is used everywhere: a string primary key, the raw
//! content, its embedding, and a free-form JSON metadata document. The
//! embedding width is the only variable part and comes from the embedder at
//! bootstrap time.

use crate::store::{
    CollectionSpec, FieldSchema, GraphBuildParams, IndexKind, IndexSpec, MetricKind,
};

/// Primary-key field: caller-supplied or generated document id.
pub const DOC_ID_FIELD: &str = "doc_id";
/// Raw document text.
pub const CONTENT_FIELD: &str = "content";
/// Dense embedding of the content.
pub const EMBEDDING_FIELD: &str = "embedding";
/// Free-form JSON attached by the caller.
pub const METADATA_FIELD: &str = "metadata";

/// Maximum character length of a document id.
pub const DOC_ID_MAX_LENGTH: u32 = 256;
/// Maximum character length of document content.
pub const CONTENT_MAX_LENGTH: u32 = 8192;

/// Shard count for new collections.
pub const SHARD_NUM: u32 = 2;
/// Description stamped on collections this service creates.
pub const COLLECTION_DESCRIPTION: &str = "auto created by docsearch";

/// Graph-construction extras sent with create-index (ignored by FLAT).
pub const INDEX_GRAPH_M: u32 = 16;
pub const INDEX_GRAPH_EF_CONSTRUCTION: u32 = 100;

/// The four-field document collection schema, with the vector field sized to
/// the embedding model.
pub fn document_collection(dim: usize) -> CollectionSpec {
    CollectionSpec {
        description: COLLECTION_DESCRIPTION.to_string(),
        shard_num: SHARD_NUM,
        fields: vec![
            FieldSchema::varchar(DOC_ID_FIELD, DOC_ID_MAX_LENGTH).primary(),
            FieldSchema::varchar(CONTENT_FIELD, CONTENT_MAX_LENGTH),
            FieldSchema::float_vector(EMBEDDING_FIELD, dim),
            FieldSchema::json(METADATA_FIELD),
        ],
    }
}

/// The similarity index this service maintains on the embedding field.
///
/// The index name is pinned to the field name (the store's default) so that
/// list/describe round-trips without guessing.
pub fn embedding_index() -> IndexSpec {
    IndexSpec {
        field: EMBEDDING_FIELD.to_string(),
        index_name: EMBEDDING_FIELD.to_string(),
        kind: IndexKind::Flat,
        metric: MetricKind::Cosine,
        graph: GraphBuildParams {
            m: INDEX_GRAPH_M,
            ef_construction: INDEX_GRAPH_EF_CONSTRUCTION,
        },
    }
}
