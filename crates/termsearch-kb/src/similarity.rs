//! Cosine similarity and exhaustive top-k ranking.
//!
//! This is the baseline every indexed backend is measured against: it scores
//! every candidate and never drops any before ranking.

use std::cmp::Ordering;

use crate::data::SimilarityError;

/// Cosine similarity of two equal-length vectors.
///
/// Returns `0.0` when either vector has zero magnitude. The result is clamped
/// to `[-1, 1]` and a NaN (from non-finite input) is reported as `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_nan() {
        return Ok(0.0);
    }
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

/// Scores every candidate against `query` and returns the best `min(k, N)`,
/// highest similarity first. Candidates with equal scores keep their input order.
pub fn top_k<'a, K, I>(query: &[f32], candidates: I, k: usize) -> Result<Vec<(K, f32)>, SimilarityError>
where
    I: IntoIterator<Item = (K, &'a [f32])>,
{
    let mut scored = candidates
        .into_iter()
        .map(|(key, vector)| cosine_similarity(query, vector).map(|score| (key, score)))
        .collect::<Result<Vec<_>, _>>()?;

    // sort_by is stable
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    Ok(scored)
}

/// `similarity * 100` rounded to one decimal place.
pub fn similarity_percent(similarity: f32) -> f32 {
    ((similarity as f64 * 1000.0).round() / 10.0) as f32
}

/// Scales a vector to unit length; a zero vector is returned unchanged.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|&v| (v as f64) * (v as f64)).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return vector.to_vec();
    }
    vector.iter().map(|&v| (v as f64 / norm) as f32).collect()
}
