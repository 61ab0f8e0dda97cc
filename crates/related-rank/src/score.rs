use related_core::error::{Error, Result};

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// `true` when cosine similarity against `v` is undefined.
pub fn is_degenerate(v: &[f32]) -> bool {
    let norm = l2_norm(v);
    norm == 0.0 || !norm.is_finite()
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`, clamped to `[-1, 1]`.
/// A zero result is always `+0.0`, so orthogonal pairs compare equal under
/// `total_cmp`.
///
/// Fails with `DegenerateVector` when either norm is zero or not finite, and
/// with `DimensionMismatch` when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 || !norm_a.is_finite() || !norm_b.is_finite() {
        return Err(Error::DegenerateVector);
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0) + 0.0)
}
