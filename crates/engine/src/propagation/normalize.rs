//! Local trust matrix
//!
//! Row-normalizes raw allocations into the row-stochastic matrix `C`.
//! Rows are sparse; a giver without usable outflow gets a `Uniform` row that
//! is resolved on the fly instead of being materialized.

use crate::graph::{TrustGraph, VertexId};
use tracing::trace;

/// One normalized row of `C`
#[derive(Debug, Clone, PartialEq)]
pub enum TrustRow {
    /// `(receiver, normalized weight)` pairs sorted by receiver, summing to 1
    Weighted(Vec<(usize, f64)>),

    /// `1 / (n - 1)` to every other vertex
    Uniform,
}

/// Row-stochastic local trust matrix
#[derive(Debug, Clone)]
pub struct LocalTrustMatrix {
    rows: Vec<TrustRow>,
}

impl LocalTrustMatrix {
    /// Normalize every giver's allocations
    ///
    /// Self-loops are dropped before summing. A row whose remaining weights
    /// sum to zero falls back to `Uniform`.
    pub fn from_graph<V: VertexId>(graph: &TrustGraph<V>) -> Self {
        let rows = (0..graph.vertex_count())
            .map(|giver| {
                let mut entries: Vec<(usize, f64)> = graph
                    .allocations(giver)
                    .iter()
                    .filter(|a| {
                        let self_loop = a.receiver == giver;
                        if self_loop {
                            trace!(vertex = %graph.vertex(giver), "Dropping self allocation");
                        }
                        !self_loop
                    })
                    .map(|a| (a.receiver, a.weight))
                    .collect();

                let total: f64 = entries.iter().map(|&(_, w)| w).sum();
                if total > 0.0 {
                    entries.retain(|&(_, w)| w > 0.0);
                    for (_, w) in entries.iter_mut() {
                        *w /= total;
                    }
                    entries.sort_by_key(|&(receiver, _)| receiver);
                    TrustRow::Weighted(entries)
                } else {
                    TrustRow::Uniform
                }
            })
            .collect();

        Self { rows }
    }

    /// Number of vertices (rows and columns)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, giver: usize) -> &TrustRow {
        &self.rows[giver]
    }

    pub fn is_uniform(&self, giver: usize) -> bool {
        matches!(self.rows[giver], TrustRow::Uniform)
    }

    /// Share each vertex receives from a uniform row
    fn uniform_share(&self) -> f64 {
        let n = self.rows.len();
        if n > 1 {
            1.0 / (n - 1) as f64
        } else {
            0.0
        }
    }

    /// `C[giver][receiver]`
    pub fn weight(&self, giver: usize, receiver: usize) -> f64 {
        match &self.rows[giver] {
            TrustRow::Weighted(entries) => entries
                .binary_search_by_key(&receiver, |&(r, _)| r)
                .map(|pos| entries[pos].1)
                .unwrap_or(0.0),
            TrustRow::Uniform if giver != receiver => self.uniform_share(),
            TrustRow::Uniform => 0.0,
        }
    }

    /// Materialize a row as a dense vector
    pub fn dense_row(&self, giver: usize) -> Vec<f64> {
        (0..self.len()).map(|receiver| self.weight(giver, receiver)).collect()
    }

    /// `out[j] = sum_i C[i][j] * scores[i]`
    ///
    /// Trust is pulled along edges: giver `i` hands `scores[i]` to its
    /// receivers. Row `excluded`, if any, is treated as a zero row.
    pub(crate) fn pull(&self, scores: &[f64], excluded: Option<usize>, out: &mut [f64]) {
        debug_assert_eq!(scores.len(), self.len());
        debug_assert_eq!(out.len(), self.len());

        out.fill(0.0);
        let share = self.uniform_share();
        let mut uniform_mass = 0.0;

        for (giver, row) in self.rows.iter().enumerate() {
            if excluded == Some(giver) {
                continue;
            }
            let score = scores[giver];
            match row {
                TrustRow::Weighted(entries) => {
                    for &(receiver, weight) in entries {
                        out[receiver] += weight * score;
                    }
                }
                TrustRow::Uniform => uniform_mass += score * share,
            }
        }

        for (receiver, slot) in out.iter_mut().enumerate() {
            *slot += uniform_mass;
            // A uniform row never pays itself
            if self.is_uniform(receiver) && excluded != Some(receiver) {
                *slot -= scores[receiver] * share;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn row_sum(matrix: &LocalTrustMatrix, giver: usize) -> f64 {
        matrix.dense_row(giver).iter().sum()
    }

    #[test]
    fn test_rows_are_normalized() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 0.6), ("c", 0.2)]),
            ("b", vec![("a", 1.0)]),
            ("c", vec![("a", 0.5), ("b", 0.5)]),
        ])
        .unwrap();
        let matrix = LocalTrustMatrix::from_graph(&graph);

        assert!((matrix.weight(0, 1) - 0.75).abs() < 1e-12);
        assert!((matrix.weight(0, 2) - 0.25).abs() < 1e-12);
        for giver in 0..3 {
            assert!((row_sum(&matrix, giver) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_edgeless_vertex_trusts_everyone_equally() {
        // A has no outgoing allocations
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![]),
            ("b", vec![("c", 1.0)]),
            ("c", vec![("b", 1.0)]),
        ])
        .unwrap();
        let matrix = LocalTrustMatrix::from_graph(&graph);

        assert!(matrix.is_uniform(0));
        assert_eq!(matrix.dense_row(0), vec![0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_self_loops_excluded() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("a", 5.0), ("b", 1.0)]),
            ("b", vec![("b", 1.0)]),
            ("c", vec![]),
        ])
        .unwrap();
        let matrix = LocalTrustMatrix::from_graph(&graph);

        assert_eq!(matrix.dense_row(0), vec![0.0, 1.0, 0.0]);
        // Only a self-loop behaves like no allocations at all
        assert!(matrix.is_uniform(1));
        assert_eq!(matrix.dense_row(1), vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_zero_weights_fall_back_to_uniform() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 0.0), ("c", 0.0)]),
            ("b", vec![]),
            ("c", vec![]),
        ])
        .unwrap();
        let matrix = LocalTrustMatrix::from_graph(&graph);

        assert!(matrix.is_uniform(0));
        assert!((row_sum(&matrix, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_random_graphs_stay_row_stochastic() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let n = rng.gen_range(2..30usize);
            let rows: Vec<(usize, Vec<(usize, f64)>)> = (0..n)
                .map(|giver| {
                    let mut edges = Vec::new();
                    for receiver in 0..n {
                        if rng.gen_bool(0.3) {
                            edges.push((receiver, rng.gen_range(0.0..1.0)));
                        }
                    }
                    (giver, edges)
                })
                .collect();
            let matrix = LocalTrustMatrix::from_graph(&TrustGraph::from_allocations(rows).unwrap());

            for giver in 0..n {
                assert!((row_sum(&matrix, giver) - 1.0).abs() < 1e-9);
                assert_eq!(matrix.weight(giver, giver), 0.0);
            }
        }
    }

    #[test]
    fn test_pull_matches_dense_product() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 0.3), ("c", 0.7)]),
            ("b", vec![]),
            ("c", vec![("a", 1.0)]),
            ("d", vec![("d", 1.0)]),
        ])
        .unwrap();
        let matrix = LocalTrustMatrix::from_graph(&graph);
        let scores = [0.1, 0.2, 0.3, 0.4];

        for excluded in [None, Some(0), Some(1), Some(3)] {
            let mut out = [0.0; 4];
            matrix.pull(&scores, excluded, &mut out);

            for receiver in 0..4 {
                let expected: f64 = (0..4)
                    .filter(|&giver| Some(giver) != excluded)
                    .map(|giver| matrix.weight(giver, receiver) * scores[giver])
                    .sum();
                assert!((out[receiver] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_single_vertex_has_no_outflow() {
        let graph = TrustGraph::from_allocations(vec![("solo", vec![])]).unwrap();
        let matrix = LocalTrustMatrix::from_graph(&graph);

        assert_eq!(matrix.dense_row(0), vec![0.0]);
    }
}
