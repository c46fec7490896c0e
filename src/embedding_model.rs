//! Local ONNX embedding backend.
//!
//! Loads an all-MiniLM-style model directory: the ONNX graph, the
//! tokenizer file set, and `config.json` for the hidden size. Documents
//! longer than the model's token window are split into chunks, embedded
//! in one batch, and averaged back into a single vector weighted by
//! chunk length.

use async_trait::async_trait;
use fastembed::{
    read_file_to_bytes, InitOptionsUserDefined, Pooling, TextEmbedding, TokenizerFiles,
    UserDefinedEmbeddingModel,
};
use serde::Deserialize;
use std::path::Path;
use text_splitter::{ChunkConfig, TextSplitter};
use tokenizers::tokenizer::Tokenizer;
use tracing::info;

use crate::embedding::Embedder;
use crate::error::EmbedError;
use crate::vector_mean;

/// The slice of the model's `config.json` we need.
#[derive(Deserialize)]
struct ModelConfig {
    hidden_size: usize,
}

/// [`Embedder`] backed by an ONNX model on local disk.
pub struct LocalEmbedder {
    model: TextEmbedding,
    tokenizer: Tokenizer,
    model_name: String,
    dimensions: usize,
    max_tokens: usize,
}

impl LocalEmbedder {
    /// Load the model files under `dir`.
    ///
    /// Expects the layout Hugging Face model snapshots use: `onnx/model.onnx`,
    /// `tokenizer.json`, `config.json`, `special_tokens_map.json`, and
    /// `tokenizer_config.json`.
    pub fn load(dir: &Path, max_tokens: usize) -> Result<Self, EmbedError> {
        let onnx_path = dir.join("onnx").join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");
        let config_path = dir.join("config.json");
        let special_tokens_map_path = dir.join("special_tokens_map.json");
        let tokenizer_config_path = dir.join("tokenizer_config.json");

        let onnx_bytes = read_file_to_bytes(&onnx_path)
            .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", onnx_path.display())))?;
        let tokenizer_file = read_file_to_bytes(&tokenizer_path)
            .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", tokenizer_path.display())))?;
        let config_file = read_file_to_bytes(&config_path)
            .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", config_path.display())))?;
        let special_tokens_map_file = read_file_to_bytes(&special_tokens_map_path).map_err(|e| {
            EmbedError::ModelLoad(format!("{}: {e}", special_tokens_map_path.display()))
        })?;
        let tokenizer_config_file = read_file_to_bytes(&tokenizer_config_path).map_err(|e| {
            EmbedError::ModelLoad(format!("{}: {e}", tokenizer_config_path.display()))
        })?;

        let config: ModelConfig = serde_json::from_slice(&config_file)
            .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", config_path.display())))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", tokenizer_path.display())))?;

        let tokenizer_files = TokenizerFiles {
            tokenizer_file,
            config_file,
            special_tokens_map_file,
            tokenizer_config_file,
        };
        let user_model =
            UserDefinedEmbeddingModel::new(onnx_bytes, tokenizer_files).with_pooling(Pooling::Mean);
        let model =
            TextEmbedding::try_new_from_user_defined(user_model, InitOptionsUserDefined::default())
                .map_err(|e| EmbedError::ModelLoad(e.to_string()))?;

        let model_name = dir_label(dir);
        info!(
            model = %model_name,
            dimensions = config.hidden_size,
            max_tokens,
            "loaded local embedding model"
        );

        Ok(Self {
            model,
            tokenizer,
            model_name,
            dimensions: config.hidden_size,
            max_tokens,
        })
    }

    /// Split `text` into chunks of at most `max_tokens` model tokens.
    fn split(&self, text: &str) -> Vec<String> {
        let splitter =
            TextSplitter::new(ChunkConfig::new(self.max_tokens).with_sizer(&self.tokenizer));
        splitter.chunks(text).map(|s| s.to_string()).collect()
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let chunks = self.split(text);
        if chunks.is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let weights: Vec<f32> = chunks.iter().map(|chunk| chunk.len() as f32).collect();
        let mut embeddings = self
            .model
            .embed(chunks, None)
            .map_err(|e| EmbedError::Inference(e.to_string()))?;
        if embeddings.len() == 1 {
            return Ok(embeddings.remove(0));
        }
        vector_mean::weighted_mean(embeddings, weights)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        let mut embeddings = self
            .model
            .embed(vec![text], None)
            .map_err(|e| EmbedError::Inference(e.to_string()))?;
        if embeddings.is_empty() {
            return Err(EmbedError::Inference("model returned no embedding".to_string()));
        }
        Ok(embeddings.remove(0))
    }
}

fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
