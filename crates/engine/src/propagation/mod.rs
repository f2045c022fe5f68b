//! Trust propagation
//!
//! Two engines share one damped fixed-point loop over the local trust
//! matrix:
//! - Standard: coupled power iteration, normalized to sum to 1
//! - Decoupled: one sub-run per vertex with that vertex's outflow removed,
//!   deliberately left unnormalized

mod decoupled;
mod normalize;
mod standard;

pub use decoupled::DecoupledEngine;
pub use normalize::{LocalTrustMatrix, TrustRow};
pub use standard::StandardEngine;

use crate::graph::VertexId;
use crate::params::PropagationParams;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Scores in vertex index order
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector<V> {
    entries: Vec<(V, f64)>,
}

impl<V: VertexId> ScoreVector<V> {
    pub fn new(entries: Vec<(V, f64)>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Score of a vertex
    pub fn get(&self, id: &V) -> Option<f64> {
        self.entries.iter().find(|(v, _)| v == id).map(|&(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&V, f64)> {
        self.entries.iter().map(|(v, s)| (v, *s))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|&(_, s)| s)
    }

    pub fn sum(&self) -> f64 {
        self.values().sum()
    }
}

/// Serializes as an `id -> score` map
impl<V: VertexId + Serialize> Serialize for ScoreVector<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, score) in &self.entries {
            map.serialize_entry(id, score)?;
        }
        map.end()
    }
}

/// Engine output
#[derive(Debug, Clone)]
pub struct PropagationResult<V> {
    pub scores: ScoreVector<V>,

    /// Iterations used; for the decoupled engine, the longest sub-run
    pub iterations: usize,

    /// Whether the threshold was met; for the decoupled engine, by every sub-run
    pub converged: bool,
}

impl<V: VertexId> PropagationResult<V> {
    /// Result for a graph without vertices
    pub fn empty() -> Self {
        Self {
            scores: ScoreVector::empty(),
            iterations: 0,
            converged: true,
        }
    }
}

/// Raw fixed point of one loop
#[derive(Debug, Clone)]
pub(crate) struct FixedPoint {
    pub scores: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Iterate `t[j] = (1 - a) * sum_i C[i][j] * t[i] + a * p[j]` from `t = p`
///
/// `p` is uniform. Stops once the largest per-vertex change drops below the
/// threshold, or after `max_iterations`. Row `excluded` contributes nothing.
pub(crate) fn iterate(
    matrix: &LocalTrustMatrix,
    params: &PropagationParams,
    excluded: Option<usize>,
) -> FixedPoint {
    let n = matrix.len();
    if n == 0 {
        return FixedPoint {
            scores: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let prior = 1.0 / n as f64;
    let alpha = params.decay_factor;
    let mut scores = vec![prior; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        iterations += 1;
        matrix.pull(&scores, excluded, &mut next);

        let mut max_diff: f64 = 0.0;
        for (slot, &old) in next.iter_mut().zip(&scores) {
            *slot = (1.0 - alpha) * *slot + alpha * prior;
            max_diff = max_diff.max((*slot - old).abs());
        }

        std::mem::swap(&mut scores, &mut next);

        if max_diff < params.convergence_threshold {
            converged = true;
            break;
        }
    }

    FixedPoint {
        scores,
        iterations,
        converged,
    }
}

/// Rescale `scores` to sum to 1
///
/// Returns `false` and leaves the scores untouched when they sum to zero.
pub fn normalize_scores(scores: &mut [f64]) -> bool {
    let total: f64 = scores.iter().sum();
    if total == 0.0 {
        return false;
    }
    for score in scores.iter_mut() {
        *score /= total;
    }
    true
}
