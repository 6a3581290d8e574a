//! Exact nearest-neighbor index over a fixed-width, row-major arena.
//!
//! All rows are zero-extended to the widest vector seen at build time.
//! Norms are precomputed so a query costs one dot product per row.

use crate::vector::{self, NORM_EPSILON};

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    ids: Vec<u64>,
    arena: Vec<f32>,
    norms: Vec<f64>,
    width: usize,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Row width after padding.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Replace the index contents with `rows`.
    pub fn build<'a, I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = (u64, &'a [f32])>,
    {
        let rows: Vec<(u64, &[f32])> = rows.into_iter().collect();
        let width = rows.iter().map(|(_, v)| v.len()).max().unwrap_or(0);

        if width != self.width {
            tracing::debug!(from = self.width, to = width, "Index width changed");
        }

        self.width = width;
        self.ids = Vec::with_capacity(rows.len());
        self.arena = Vec::with_capacity(rows.len() * width);
        self.norms = Vec::with_capacity(rows.len());

        for (id, v) in rows {
            let start = self.arena.len();
            self.arena.extend_from_slice(v);
            self.arena.resize(start + width, 0.0);
            self.norms.push(vector::l2_norm(&self.arena[start..]));
            self.ids.push(id);
        }
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.arena[i * self.width..(i + 1) * self.width]
    }

    /// The `top_k` most similar rows as `(id, cosine similarity)`, best
    /// first. Ties keep insertion order. Empty when the index or query is
    /// empty, or the query is all zeros.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<(u64, f64)> {
        if self.is_empty() || self.width == 0 || query.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let q = vector::fit_width(query, self.width);
        let q_norm = vector::l2_norm(&q);
        if q_norm < NORM_EPSILON {
            return Vec::new();
        }

        let mut scored: Vec<(u64, f64)> = (0..self.ids.len())
            .map(|i| {
                let denom = self.norms[i] * q_norm;
                let sim = if denom < NORM_EPSILON {
                    0.0
                } else {
                    vector::dot(self.row(i), &q) / denom
                };
                (self.ids[i], sim)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(rows: &[(u64, Vec<f32>)]) -> VectorIndex {
        let mut index = VectorIndex::new();
        index.build(rows.iter().map(|(id, v)| (*id, v.as_slice())));
        index
    }

    #[test]
    fn pads_to_widest_row() {
        let index = build(&[(1, vec![1.0]), (2, vec![0.0, 1.0, 0.0])]);
        assert_eq!(index.width(), 3);
        assert_eq!(index.len(), 2);
        assert_eq!(index.row(0), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn ranks_by_similarity() {
        let index = build(&[
            (1, vec![0.0, 1.0, 0.0]),
            (2, vec![1.0, 0.0, 0.0]),
            (3, vec![0.5, 0.5, 0.0]),
        ]);
        let hits = index.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 2);
        assert!((hits[0].1 - 1.0).abs() < 1e-9);
        assert_eq!(hits[1].0, 3);
    }

    #[test]
    fn short_query_is_padded_long_query_truncated() {
        let index = build(&[(1, vec![1.0, 0.0]), (2, vec![0.0, 1.0])]);
        assert_eq!(index.search(&[1.0], 1)[0].0, 1);
        assert_eq!(index.search(&[0.0, 1.0, 9.0], 1)[0].0, 2);
    }

    #[test]
    fn zero_query_yields_nothing() {
        let index = build(&[(1, vec![1.0, 0.0])]);
        assert!(index.search(&[0.0, 0.0], 5).is_empty());
        assert!(index.search(&[], 5).is_empty());
    }

    #[test]
    fn zero_rows_score_zero() {
        let index = build(&[(1, vec![0.0]), (2, vec![1.0])]);
        let hits = index.search(&[1.0], 5);
        assert_eq!(hits, vec![(2, 1.0), (1, 0.0)]);
    }

    #[test]
    fn empty_index() {
        let index = VectorIndex::new();
        assert!(index.search(&[1.0], 5).is_empty());
    }

    #[test]
    fn rebuild_replaces_contents() {
        let mut index = build(&[(1, vec![1.0, 0.0, 0.0])]);
        index.build(std::iter::empty::<(u64, &[f32])>());
        assert!(index.is_empty());
        assert_eq!(index.width(), 0);
    }
}
