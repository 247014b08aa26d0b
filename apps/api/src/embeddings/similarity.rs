//! Vector math: pooling, normalization and cosine similarity.

use crate::embeddings::EmbeddingError;

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalizes in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Averages per-token feature rows into one vector of `dims` components.
pub fn mean_pool(tokens: &[Vec<f32>], dims: usize) -> Result<Vec<f32>, EmbeddingError> {
    if tokens.is_empty() {
        return Err(EmbeddingError::Extraction(
            "model returned no token features".to_string(),
        ));
    }
    let mut pooled = vec![0.0_f32; dims];
    for row in tokens {
        if row.len() != dims {
            return Err(EmbeddingError::Dimension {
                expected: dims,
                actual: row.len(),
            });
        }
        for (acc, x) in pooled.iter_mut().zip(row) {
            *acc += x;
        }
    }
    let count = tokens.len() as f32;
    pooled.iter_mut().for_each(|x| *x /= count);
    Ok(pooled)
}

/// Cosine similarity in [-1, 1].
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ,
/// since the ratio is undefined there.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude = l2_norm(a) * l2_norm(b);
    if magnitude == 0.0 || !magnitude.is_finite() {
        return 0.0;
    }
    (dot / magnitude).clamp(-1.0, 1.0)
}

/// Scores every candidate against `query`, highest similarity first.
pub fn rank<T>(query: &[f32], candidates: impl IntoIterator<Item = (T, Vec<f32>)>) -> Vec<(T, f32)> {
    let mut scored: Vec<(T, f32)> = candidates
        .into_iter()
        .map(|(item, vector)| {
            let score = cosine_similarity(query, &vector);
            (item, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}
