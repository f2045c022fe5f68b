//! Compute facade
//!
//! Runs the configured engine and the rank/display mapper, producing the
//! report the service layer persists. Also hosts comparison mode, which runs
//! both engines over the same snapshot.

use crate::graph::{TrustGraph, VertexId};
use crate::params::PropagationParams;
use crate::propagation::{DecoupledEngine, PropagationResult, ScoreVector, StandardEngine};
use crate::ranking::{DisplayScale, LinearScale, RankMapper, RankedScore};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};
use trustgraph_common::config::{AppConfig, PropagationMode};
use trustgraph_common::errors::{ErrorResponse, Result};
use trustgraph_common::metrics::ComputationMetrics;

/// Successful production computation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeReport<V> {
    pub success: bool,
    pub mode: PropagationMode,
    pub iterations: usize,
    pub converged: bool,
    pub num_vertices: usize,

    /// Digest of the graph snapshot the scores were computed from
    pub fingerprint: String,

    /// Ranked best first
    pub scores: Vec<RankedScore<V>>,
}

/// Success or failure envelope
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ComputeResponse<V> {
    Completed(ComputeReport<V>),
    Failed(ErrorResponse),
}

impl<V> From<Result<ComputeReport<V>>> for ComputeResponse<V> {
    fn from(result: Result<ComputeReport<V>>) -> Self {
        match result {
            Ok(report) => ComputeResponse::Completed(report),
            Err(err) => ComputeResponse::Failed(ErrorResponse::from(&err)),
        }
    }
}

impl<V> ComputeResponse<V> {
    pub fn is_success(&self) -> bool {
        matches!(self, ComputeResponse::Completed(_))
    }
}

/// Standard and modified scores for the same snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Comparison<V: VertexId> {
    pub standard: ScoreVector<V>,
    pub modified: ScoreVector<V>,
}

/// Stateless computation entry point
#[derive(Debug, Clone)]
pub struct TrustComputer<S = LinearScale> {
    params: PropagationParams,
    mapper: RankMapper<S>,
}

impl TrustComputer<LinearScale> {
    /// Build from loaded configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            PropagationParams::from(&config.engine),
            RankMapper::from_settings(&config.display),
        )
    }
}

impl<S: DisplayScale> TrustComputer<S> {
    /// Create a computer, validating the parameters
    pub fn new(params: PropagationParams, mapper: RankMapper<S>) -> Result<Self> {
        Ok(Self {
            params: params.validated()?,
            mapper,
        })
    }

    pub fn params(&self) -> &PropagationParams {
        &self.params
    }

    /// Run the configured engine and rank the result
    #[instrument(skip(self, graph), fields(vertices = graph.vertex_count(), mode = self.params.mode.as_str()))]
    pub fn compute<V: VertexId>(&self, graph: &TrustGraph<V>) -> ComputeReport<V> {
        let metrics = ComputationMetrics::start(self.params.mode);

        let result = self.run(graph, self.params.mode);
        let scores = self.mapper.rank(&result.scores);

        metrics.finish(graph.vertex_count(), result.iterations, result.converged);
        info!(
            iterations = result.iterations,
            converged = result.converged,
            "Trust scores computed"
        );

        ComputeReport {
            success: true,
            mode: self.params.mode,
            iterations: result.iterations,
            converged: result.converged,
            num_vertices: graph.vertex_count(),
            fingerprint: graph.fingerprint(),
            scores,
        }
    }

    /// Run both engines over the same snapshot
    #[instrument(skip(self, graph), fields(vertices = graph.vertex_count()))]
    pub fn compare<V: VertexId>(&self, graph: &TrustGraph<V>) -> Comparison<V> {
        Comparison {
            standard: self.run(graph, PropagationMode::Standard).scores,
            modified: self.run(graph, PropagationMode::Modified).scores,
        }
    }

    /// Parse a JSON graph and compute, wrapping the outcome in the envelope
    pub fn compute_json(&self, input: &Value) -> ComputeResponse<String> {
        TrustGraph::from_json(input)
            .map(|graph| self.compute(&graph))
            .into()
    }

    fn run<V: VertexId>(&self, graph: &TrustGraph<V>, mode: PropagationMode) -> PropagationResult<V> {
        // Parameters were validated on construction
        let params = self.params.with_mode(mode);
        match mode {
            PropagationMode::Standard => StandardEngine::from_validated(params).compute(graph),
            PropagationMode::Modified => DecoupledEngine::from_validated(params).compute(graph),
        }
    }
}

/// Compute with the default rank mapper
pub fn compute<V: VertexId>(graph: &TrustGraph<V>, params: PropagationParams) -> Result<ComputeReport<V>> {
    Ok(TrustComputer::new(params, RankMapper::default())?.compute(graph))
}

/// Compare both engines with the given parameters
pub fn compare<V: VertexId>(graph: &TrustGraph<V>, params: PropagationParams) -> Result<Comparison<V>> {
    Ok(TrustComputer::new(params, RankMapper::default())?.compare(graph))
}
