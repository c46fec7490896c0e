//! Error types for store and embedding operations.

use thiserror::Error;

/// Errors from the vector-store client.
///
/// Absence of a collection or index is not an error anywhere in the store
/// interface; existence checks answer with `bool`/`Option` and reserve `Err`
/// for calls that actually failed.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached (connect, TLS, timeout, body read).
    #[error("vector store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success code.
    #[error("{op}: store rejected request (code {code}): {message}")]
    Rejected {
        op: &'static str,
        code: i64,
        message: String,
    },

    /// The store answered 2xx but the body was not interpretable.
    #[error("{op}: unexpected response: {detail}")]
    InvalidResponse { op: &'static str, detail: String },

    /// Bad client configuration (endpoint URL, timeout).
    #[error("store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create a rejection error for the given operation.
    pub fn rejected<S: Into<String>>(op: &'static str, code: i64, message: S) -> Self {
        StoreError::Rejected {
            op,
            code,
            message: message.into(),
        }
    }

    /// Create an invalid-response error for the given operation.
    pub fn invalid<S: Into<String>>(op: &'static str, detail: S) -> Self {
        StoreError::InvalidResponse {
            op,
            detail: detail.into(),
        }
    }
}

/// Errors from embedding text.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Model files missing or unreadable.
    #[error("model loading failed: {0}")]
    ModelLoad(String),

    /// Inference or pooling failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Nothing to embed.
    #[error("cannot embed empty input")]
    EmptyInput,
}
