//! Grant allocation
//!
//! Single-pass propagation over an application graph (applications vouching
//! for each other), followed by proportional funding with a per-applicant
//! floor.
//!
//! The update here weights the propagated term by `a` and the uniform term by
//! `1 - a`:
//!
//! `s[i] = (1 - a) / n + a * sum_j s[j] * C[j][i]`
//!
//! The floor is applied to each applicant independently and nothing is
//! rebalanced afterwards, so recommendations can add up to more than the
//! budget. `GrantReport::over_allocated` flags that case.

use crate::graph::{TrustGraph, VertexId};
use crate::propagation::LocalTrustMatrix;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use trustgraph_common::config::GrantSettings;
use trustgraph_common::errors::{Result, TrustError};
use trustgraph_common::metrics;
use trustgraph_common::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DECAY_FACTOR, DEFAULT_MAX_ITERATIONS};
use validator::Validate;

/// Grant round parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    /// Budget shared between applicants
    #[validate(range(min = 0.0))]
    pub total_funding: f64,

    /// Floor for every recommendation
    #[validate(range(min = 0.0))]
    pub minimum_grant_size: f64,

    #[serde(default = "default_decay_factor")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub decay_factor: f64,

    #[serde(default = "default_max_iterations")]
    #[validate(range(min = 1))]
    pub max_iterations: usize,

    #[serde(default = "default_convergence_threshold")]
    #[validate(range(exclusive_min = 0.0))]
    pub convergence_threshold: f64,
}

fn default_decay_factor() -> f64 { DEFAULT_DECAY_FACTOR }
fn default_max_iterations() -> usize { DEFAULT_MAX_ITERATIONS }
fn default_convergence_threshold() -> f64 { DEFAULT_CONVERGENCE_THRESHOLD }

impl GrantRequest {
    pub fn new(total_funding: f64, minimum_grant_size: f64) -> Self {
        Self {
            total_funding,
            minimum_grant_size,
            decay_factor: default_decay_factor(),
            max_iterations: default_max_iterations(),
            convergence_threshold: default_convergence_threshold(),
        }
    }

    /// Validate, returning the request unchanged on success
    pub fn validated(self) -> Result<Self> {
        let finite = [
            self.total_funding,
            self.minimum_grant_size,
            self.decay_factor,
            self.convergence_threshold,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(TrustError::InvalidParameters {
                message: "grant amounts and propagation parameters must be finite".to_string(),
            });
        }
        self.validate()?;
        Ok(self)
    }
}

impl From<&GrantSettings> for GrantRequest {
    fn from(settings: &GrantSettings) -> Self {
        Self {
            total_funding: settings.total_funding,
            minimum_grant_size: settings.minimum_grant_size,
            decay_factor: settings.decay_factor,
            max_iterations: settings.max_iterations,
            convergence_threshold: settings.convergence_threshold,
        }
    }
}

/// Funding recommendation for one application
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantAllocation<V> {
    pub application_id: V,
    pub allocated_trust: f64,
    pub recommended_funding: f64,
    pub rank: usize,
}

/// Ranked recommendations for a grant round
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantReport<V> {
    /// Sorted by allocated trust, best first
    pub allocations: Vec<GrantAllocation<V>>,
    pub iterations: usize,
    pub converged: bool,
    pub total_recommended: f64,

    /// Floored recommendations exceed the budget
    pub over_allocated: bool,
}

/// Grant allocation engine
#[derive(Debug, Clone)]
pub struct GrantEngine {
    request: GrantRequest,
}

impl GrantEngine {
    /// Create a new engine, validating the request
    pub fn new(request: GrantRequest) -> Result<Self> {
        Ok(Self {
            request: request.validated()?,
        })
    }

    pub fn request(&self) -> &GrantRequest {
        &self.request
    }

    /// Score, rank and fund every application in the graph
    ///
    /// Equal scores keep their graph order.
    #[instrument(skip(self, graph), fields(applications = graph.vertex_count()))]
    pub fn allocate<V: VertexId>(&self, graph: &TrustGraph<V>) -> GrantReport<V> {
        let start = Instant::now();
        let n = graph.vertex_count();
        if n == 0 {
            return GrantReport {
                allocations: Vec::new(),
                iterations: 0,
                converged: true,
                total_recommended: 0.0,
                over_allocated: false,
            };
        }

        let matrix = LocalTrustMatrix::from_graph(graph);
        let (scores, iterations, converged) = self.propagate(&matrix);
        if !converged {
            warn!(iterations, "Grant propagation hit the iteration cap");
        }

        let funding = recommend_funding(
            &scores,
            self.request.total_funding,
            self.request.minimum_grant_size,
        );

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let allocations: Vec<GrantAllocation<V>> = order
            .into_iter()
            .enumerate()
            .map(|(position, index)| GrantAllocation {
                application_id: graph.vertex(index).clone(),
                allocated_trust: scores[index],
                recommended_funding: funding[index],
                rank: position + 1,
            })
            .collect();

        let total_recommended: f64 = funding.iter().sum();
        let over_allocated = total_recommended > self.request.total_funding;
        if over_allocated {
            info!(
                total_recommended,
                budget = self.request.total_funding,
                "Funding floor pushes recommendations over budget"
            );
        }

        metrics::record_grant_allocation(start.elapsed().as_secs_f64(), n, over_allocated);

        GrantReport {
            allocations,
            iterations,
            converged,
            total_recommended,
            over_allocated,
        }
    }

    fn propagate(&self, matrix: &LocalTrustMatrix) -> (Vec<f64>, usize, bool) {
        let n = matrix.len();
        let alpha = self.request.decay_factor;
        let base = (1.0 - alpha) / n as f64;

        let mut scores = vec![1.0 / n as f64; n];
        let mut next = vec![0.0; n];

        for iteration in 1..=self.request.max_iterations {
            matrix.pull(&scores, None, &mut next);

            let mut max_diff: f64 = 0.0;
            for (slot, &old) in next.iter_mut().zip(&scores) {
                *slot = base + alpha * *slot;
                max_diff = max_diff.max((*slot - old).abs());
            }
            std::mem::swap(&mut scores, &mut next);

            if max_diff < self.request.convergence_threshold {
                debug!(iterations = iteration, "Grant propagation converged");
                return (scores, iteration, true);
            }
        }

        (scores, self.request.max_iterations, false)
    }
}

/// `max(total * s / sum(s), floor)` for every score
///
/// If the scores sum to zero every applicant gets the floor.
pub fn recommend_funding(scores: &[f64], total_funding: f64, minimum_grant_size: f64) -> Vec<f64> {
    let sum: f64 = scores.iter().sum();
    scores
        .iter()
        .map(|&score| {
            let share = if sum > 0.0 {
                total_funding * score / sum
            } else {
                0.0
            };
            share.max(minimum_grant_size)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_applied_without_rebalancing() {
        // One dominant applicant, nine near zero
        let mut scores = vec![0.91];
        scores.extend(std::iter::repeat(0.01).take(9));

        let funding = recommend_funding(&scores, 50_000.0, 1_000.0);

        assert!((funding[0] - 45_500.0).abs() < 1e-6);
        assert!(funding[1..].iter().all(|&f| f == 1_000.0));

        let total: f64 = funding.iter().sum();
        assert!((total - 54_500.0).abs() < 1e-6);
        assert!(total > 50_000.0);
    }

    #[test]
    fn test_zero_scores_get_the_floor() {
        let funding = recommend_funding(&[0.0, 0.0], 10_000.0, 500.0);
        assert_eq!(funding, vec![500.0, 500.0]);
    }

    #[test]
    fn test_endorsed_application_ranks_first() {
        let graph = TrustGraph::from_allocations(vec![
            ("app-1", vec![("app-3", 1.0)]),
            ("app-2", vec![("app-3", 1.0)]),
            ("app-3", vec![("app-1", 0.5), ("app-2", 0.5)]),
            ("app-4", vec![("app-3", 1.0)]),
        ])
        .unwrap();
        let engine = GrantEngine::new(GrantRequest {
            decay_factor: 0.5,
            ..GrantRequest::new(50_000.0, 1_000.0)
        })
        .unwrap();

        let report = engine.allocate(&graph);

        assert!(report.converged);
        assert_eq!(report.allocations[0].application_id, "app-3");
        assert_eq!(report.allocations[0].rank, 1);
        let ranks: Vec<_> = report.allocations.iter().map(|a| a.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);

        let trust: f64 = report.allocations.iter().map(|a| a.allocated_trust).sum();
        assert!((trust - 1.0).abs() < 1e-9);
        assert!(!report.over_allocated);
        assert!((report.total_recommended - 50_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_input_order() {
        // Symmetric graph: every application ends up with the same score
        let graph = TrustGraph::from_allocations(vec![
            ("c", vec![]),
            ("a", vec![]),
            ("b", vec![]),
        ])
        .unwrap();
        let report = GrantEngine::new(GrantRequest::new(9_000.0, 0.0))
            .unwrap()
            .allocate(&graph);

        let ids: Vec<_> = report.allocations.iter().map(|a| a.application_id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        for allocation in &report.allocations {
            assert!((allocation.recommended_funding - 3_000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_floor_over_allocation_reported() {
        let mut rows = vec![("star".to_string(), vec![])];
        for i in 0..9 {
            rows.push((format!("app-{}", i), vec![("star".to_string(), 1.0)]));
        }
        let graph = TrustGraph::from_allocations(rows).unwrap();
        // star settles near 0.37, each endorser near 0.07 (~3500 before the floor)
        let engine = GrantEngine::new(GrantRequest {
            decay_factor: 0.5,
            ..GrantRequest::new(50_000.0, 4_000.0)
        })
        .unwrap();

        let report = engine.allocate(&graph);

        assert_eq!(report.allocations[0].application_id, "star");
        assert!(report.allocations[1..]
            .iter()
            .all(|a| a.recommended_funding == 4_000.0));
        assert!(report.over_allocated);
        assert!(report.total_recommended > 50_000.0);
    }

    #[test]
    fn test_empty_graph() {
        let graph: TrustGraph<String> = TrustGraph::new();
        let report = GrantEngine::new(GrantRequest::new(1_000.0, 10.0))
            .unwrap()
            .allocate(&graph);

        assert!(report.allocations.is_empty());
        assert_eq!(report.total_recommended, 0.0);
    }

    #[test]
    fn test_negative_budget_rejected() {
        let err = GrantEngine::new(GrantRequest::new(-5.0, 10.0)).unwrap_err();
        assert!(matches!(err, TrustError::InvalidParameters { .. }));
    }

    #[test]
    fn test_wire_shape() {
        let allocation = GrantAllocation {
            application_id: "app-1",
            allocated_trust: 0.4,
            recommended_funding: 2_000.0,
            rank: 1,
        };
        let json = serde_json::to_value(&allocation).unwrap();

        assert_eq!(json["applicationId"], "app-1");
        assert_eq!(json["allocatedTrust"], 0.4);
        assert_eq!(json["recommendedFunding"], 2_000.0);
        assert_eq!(json["rank"], 1);
    }
}
