//! Standard EigenTrust propagation
//!
//! Coupled power iteration over the full local trust matrix against a
//! uniform pretrust vector.

use super::{iterate, normalize_scores, LocalTrustMatrix, PropagationResult, ScoreVector};
use crate::graph::{TrustGraph, VertexId};
use crate::params::PropagationParams;
use tracing::{debug, instrument, warn};
use trustgraph_common::errors::Result;

/// Standard propagation engine
#[derive(Debug, Clone)]
pub struct StandardEngine {
    params: PropagationParams,
}

impl StandardEngine {
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

    /// Compute global trust for every vertex
    ///
    /// Scores sum to 1 unless the raw fixed point sums to zero, in which case
    /// normalization is skipped. Hitting the iteration cap is reported through
    /// `converged`, never as an error.
    #[instrument(skip(self, graph), fields(vertices = graph.vertex_count()))]
    pub fn compute<V: VertexId>(&self, graph: &TrustGraph<V>) -> PropagationResult<V> {
        let n = graph.vertex_count();
        if n == 0 {
            return PropagationResult::empty();
        }

        // Nobody to trust: the lone vertex holds all of it
        if n == 1 {
            return PropagationResult {
                scores: ScoreVector::new(vec![(graph.vertex(0).clone(), 1.0)]),
                iterations: 0,
                converged: true,
            };
        }

        let matrix = LocalTrustMatrix::from_graph(graph);
        let mut run = iterate(&matrix, &self.params, None);

        if !normalize_scores(&mut run.scores) {
            warn!("Scores sum to zero, skipping normalization");
        }

        if run.converged {
            debug!(iterations = run.iterations, "Standard propagation converged");
        } else {
            warn!(
                iterations = run.iterations,
                threshold = self.params.convergence_threshold,
                "Standard propagation hit the iteration cap"
            );
        }

        PropagationResult {
            scores: ScoreVector::new(graph.vertices().iter().cloned().zip(run.scores).collect()),
            iterations: run.iterations,
            converged: run.converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn engine() -> StandardEngine {
        StandardEngine::new(PropagationParams::default()).unwrap()
    }

    #[test]
    fn test_mutual_trust_splits_evenly() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);

        let graph = TrustGraph::from_allocations(vec![
            (a, vec![(b, 1.0)]),
            (b, vec![(a, 1.0)]),
        ])
        .unwrap();
        let result = engine().compute(&graph);

        assert!(result.converged);
        assert!((result.scores.get(&a).unwrap() - 0.5).abs() < 1e-9);
        assert!((result.scores.get(&b).unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_trusted_vertex_ranks_higher() {
        // A -> B <- D, B -> C
        // B should have the highest score
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 1.0)]),
            ("b", vec![("c", 1.0)]),
            ("c", vec![]),
            ("d", vec![("b", 1.0)]),
        ])
        .unwrap();
        let result = engine().compute(&graph);

        let b = result.scores.get(&"b").unwrap();
        let a = result.scores.get(&"a").unwrap();
        assert!(b > a, "B should rank higher than A");
        assert!((result.scores.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_vertex() {
        let graph = TrustGraph::from_allocations(vec![("solo", vec![])]).unwrap();
        let result = engine().compute(&graph);

        assert!(result.converged);
        assert!(result.iterations <= 1);
        assert_eq!(result.scores.get(&"solo"), Some(1.0));
    }

    #[test]
    fn test_empty_graph() {
        let graph: TrustGraph<&str> = TrustGraph::new();
        let result = engine().compute(&graph);

        assert!(result.scores.is_empty());
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_iteration_cap_is_not_an_error() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 1.0)]),
            ("b", vec![("c", 1.0)]),
            ("c", vec![("a", 0.2), ("b", 0.8)]),
        ])
        .unwrap();
        let params = PropagationParams {
            max_iterations: 2,
            convergence_threshold: 1e-12,
            ..Default::default()
        };
        let result = StandardEngine::new(params).unwrap().compute(&graph);

        assert_eq!(result.iterations, 2);
        assert!(!result.converged);
        assert!((result.scores.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let graph = TrustGraph::from_allocations(vec![
            ("a", vec![("b", 0.3), ("c", 0.7)]),
            ("b", vec![]),
            ("c", vec![("a", 1.0), ("b", 0.5)]),
        ])
        .unwrap();

        let first = engine().compute(&graph);
        let second = engine().compute(&graph);
        assert_eq!(first.scores, second.scores);
        assert_eq!(first.iterations, second.iterations);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = PropagationParams {
            decay_factor: -0.1,
            ..Default::default()
        };
        assert!(StandardEngine::new(params).is_err());
    }
}
