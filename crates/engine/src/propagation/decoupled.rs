//! Decoupled ("modified") propagation
//!
//! A vertex's score is computed from a run in which its own outgoing
//! allocations carry no flow, so how a vertex allocates trust can never feed
//! back into its own score through cycles.
//!
//! For every vertex `k`:
//! 1. run the damped fixed point with row `k` of `C` zeroed
//! 2. `s_k = sum_{g != k} C[g][k] * sub[g]`
//! 3. `t[k] = (1 - a) * s_k + a / n`
//!
//! Zeroing row `k` stands in for rebuilding the graph with `k` allocating
//! only to a synthetic sink; the full matrix is normalized once and reused.
//! Results are not rescaled to sum to 1: a global rescale would make every
//! score depend on every other vertex's computation again.
//!
//! Cost is `n` full propagations, `O(n^4)` for dense graphs. Run it as a
//! background job, not on a request path.

use super::{iterate, LocalTrustMatrix, PropagationResult, ScoreVector};
use crate::graph::{TrustGraph, VertexId};
use crate::params::PropagationParams;
use tracing::{debug, instrument, trace, warn};
use trustgraph_common::errors::Result;

/// Decoupled propagation engine
#[derive(Debug, Clone)]
pub struct DecoupledEngine {
    params: PropagationParams,
}

impl DecoupledEngine {
    /// Create a new engine, validating the parameters
    pub fn new(params: PropagationParams) -> Result<Self> {
        Ok(Self {
            params: params.validated()?,
        })
    }

    /// Wrap parameters that were already validated
    pub(crate) fn from_validated(params: PropagationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PropagationParams {
        &self.params
    }

    /// Compute self-excluded trust for every vertex
    #[instrument(skip(self, graph), fields(vertices = graph.vertex_count()))]
    pub fn compute<V: VertexId>(&self, graph: &TrustGraph<V>) -> PropagationResult<V> {
        let n = graph.vertex_count();
        if n == 0 {
            return PropagationResult::empty();
        }

        let matrix = LocalTrustMatrix::from_graph(graph);
        let alpha = self.params.decay_factor;
        let prior = 1.0 / n as f64;

        let mut scores = Vec::with_capacity(n);
        let mut max_iterations = 0;
        let mut stalled = 0usize;

        for k in 0..n {
            let sub = iterate(&matrix, &self.params, Some(k));
            max_iterations = max_iterations.max(sub.iterations);
            if !sub.converged {
                stalled += 1;
            }

            let incoming: f64 = (0..n)
                .filter(|&giver| giver != k)
                .map(|giver| matrix.weight(giver, k) * sub.scores[giver])
                .sum();
            let score = (1.0 - alpha) * incoming + alpha * prior;

            trace!(
                vertex = %graph.vertex(k),
                iterations = sub.iterations,
                score,
                "Decoupled sub-run finished"
            );
            scores.push((graph.vertex(k).clone(), score));
        }

        let converged = stalled == 0;
        if converged {
            debug!(max_iterations, "Decoupled propagation converged");
        } else {
            warn!(
                stalled,
                max_iterations,
                "Decoupled sub-runs hit the iteration cap"
            );
        }

        PropagationResult {
            scores: ScoreVector::new(scores),
            iterations: max_iterations,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::StandardEngine;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn engine() -> DecoupledEngine {
        DecoupledEngine::new(PropagationParams::default()).unwrap()
    }

    fn random_graph(rng: &mut StdRng, n: usize) -> TrustGraph<usize> {
        let rows: Vec<(usize, Vec<(usize, f64)>)> = (0..n)
            .map(|giver| {
                let mut edges = Vec::new();
                for receiver in 0..n {
                    if rng.gen_bool(0.4) {
                        edges.push((receiver, rng.gen_range(0.0..1.0)));
                    }
                }
                (giver, edges)
            })
            .collect();
        TrustGraph::from_allocations(rows).unwrap()
    }

    #[test]
    fn test_two_cycle_diverges_from_standard() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 1.0)]),
            ("b", vec![("a", 1.0)]),
        ])
        .unwrap();

        let standard = StandardEngine::new(PropagationParams::default())
            .unwrap()
            .compute(&graph);
        let modified = engine().compute(&graph);

        assert!((standard.scores.get(&"a").unwrap() - 0.5).abs() < 1e-9);

        // Sub-run for a: b keeps only its prior share 0.15 * 0.5 = 0.075,
        // so a = 0.85 * 0.075 + 0.075
        let a = modified.scores.get(&"a").unwrap();
        assert!((a - 0.13875).abs() < 1e-9);
        assert!((a - 0.5).abs() > 0.1);
        assert!(modified.converged);
    }

    #[test]
    fn test_own_allocations_do_not_change_own_score() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 0.5), ("c", 0.5)]),
            ("b", vec![("a", 1.0)]),
            ("c", vec![("a", 0.2), ("b", 0.8)]),
            ("d", vec![("c", 1.0)]),
        ])
        .unwrap();
        let before = engine().compute(&graph);

        for allocations in [vec![("d", 1.0)], vec![], vec![("b", 0.1), ("a", 3.0)]] {
            let changed = graph.with_allocations_of(&"a", allocations).unwrap();
            let after = engine().compute(&changed);

            let diff = (before.scores.get(&"a").unwrap() - after.scores.get(&"a").unwrap()).abs();
            assert!(diff < 1e-12, "a's score moved by {}", diff);
        }
    }

    #[test]
    fn test_self_exclusion_on_random_graphs() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..5 {
            let n = rng.gen_range(3..12usize);
            let graph = random_graph(&mut rng, n);
            let k = rng.gen_range(0..n);
            let before = engine().compute(&graph);

            let mut reallocated = Vec::new();
            for receiver in 0..n {
                if rng.gen_bool(0.5) {
                    reallocated.push((receiver, rng.gen_range(0.0..1.0)));
                }
            }
            let changed = graph.with_allocations_of(&k, reallocated).unwrap();
            let after = engine().compute(&changed);

            let diff = (before.scores.get(&k).unwrap() - after.scores.get(&k).unwrap()).abs();
            assert!(diff < 1e-12);
        }
    }

    #[test]
    fn test_scores_are_not_normalized() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 1.0)]),
            ("b", vec![("a", 1.0)]),
        ])
        .unwrap();
        let result = engine().compute(&graph);

        // Both vertices land on 0.13875, far from a distribution
        assert!((result.scores.sum() - 0.2775).abs() < 1e-9);
    }

    #[test]
    fn test_empty_graph() {
        let graph: TrustGraph<usize> = TrustGraph::new();
        let result = engine().compute(&graph);

        assert!(result.scores.is_empty());
        assert!(result.converged);
    }

    #[test]
    fn test_iterations_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let graph = random_graph(&mut rng, 8);
        let params = PropagationParams {
            max_iterations: 3,
            convergence_threshold: 1e-15,
            ..Default::default()
        };
        let result = DecoupledEngine::new(params).unwrap().compute(&graph);

        assert!(result.iterations <= 3);
        assert_eq!(result.scores.len(), 8);
    }
}
