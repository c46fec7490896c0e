//! Length-weighted averaging of chunk embeddings.

use ndarray::{Array, Array2, Axis};
use ndarray_stats::SummaryStatisticsExt;

use crate::error::EmbedError;

/// Average `embeddings` row-wise, weighting each row by `weights`.
///
/// Collapses per-chunk embeddings into a single document vector; callers
/// pass chunk lengths as weights so long chunks count for more.
pub fn weighted_mean(embeddings: Vec<Vec<f32>>, weights: Vec<f32>) -> Result<Vec<f32>, EmbedError> {
    if embeddings.is_empty() {
        return Err(EmbedError::EmptyInput);
    }
    if embeddings.len() != weights.len() {
        return Err(EmbedError::Inference(format!(
            "{} embeddings but {} weights",
            embeddings.len(),
            weights.len()
        )));
    }

    let rows = embeddings.len();
    let dim = embeddings[0].len();
    let flat: Vec<f32> = embeddings.into_iter().flatten().collect();
    let array = Array2::from_shape_vec((rows, dim), flat)
        .map_err(|e| EmbedError::Inference(e.to_string()))?;

    let weights = Array::from_vec(weights);
    let mean = array
        .weighted_mean_axis(Axis(0), &weights)
        .map_err(|e| EmbedError::Inference(e.to_string()))?;

    let (v, _) = mean.into_raw_vec_and_offset();
    Ok(v)
}
