//! Vector math for embeddings.
//!
//! Pure-Rust implementations of:
//! - Dot products and L2 norms
//! - Normalization
//! - Zero-padding / truncation to a fixed width

/// Values below this are treated as zero when dividing by a norm.
pub const NORM_EPSILON: f64 = 1e-10;

/// Dot product accumulated in f64. Extra trailing values in the longer
/// slice are ignored.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum()
}

/// Euclidean (L2) norm.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Scale `v` to unit length in place. Zero vectors are left as they are.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm < NORM_EPSILON {
        return;
    }
    for x in v.iter_mut() {
        *x = (*x as f64 / norm) as f32;
    }
}

/// Whether every component is zero (true for an empty vector).
#[cfg(test)]
pub fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

/// Zero-extend or truncate `v` to exactly `width` components.
pub fn fit_width(v: &[f32], width: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(width);
    out.extend(v.iter().take(width));
    out.resize(width, 0.0);
    out
}

/// Cosine similarity between two vectors, for checking embeddings in tests.
/// Index search uses the precomputed row norms instead.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ, either vector is empty, or either is zero.
#[cfg(test)]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let denom = l2_norm(a) * l2_norm(b);
    if denom < NORM_EPSILON {
        return 0.0;
    }

    dot(a, b) / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] · [1,0] = 1, |[1,1]| = sqrt(2), |[1,0]| = 1
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn fit_width_pads_and_truncates() {
        assert_eq!(fit_width(&[1.0], 3), vec![1.0, 0.0, 0.0]);
        assert_eq!(fit_width(&[1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert!(fit_width(&[1.0], 0).is_empty());
    }

    #[test]
    fn zero_detection() {
        assert!(is_zero(&[]));
        assert!(is_zero(&[0.0, 0.0]));
        assert!(!is_zero(&[0.0, 0.1]));
    }
}
