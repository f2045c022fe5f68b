//! TrustGraph Engine
//!
//! EigenTrust-style reputation over a directed, weighted trust graph:
//! - Local trust normalization
//! - Standard (coupled) propagation
//! - Decoupled propagation, where a vertex's own allocations never feed its score
//! - Grant funding recommendations with a per-applicant floor
//! - Rank and display-score mapping
//! - Background recomputation on tokio's blocking pool

pub mod compute;
pub mod grants;
pub mod graph;
pub mod jobs;
pub mod params;
pub mod propagation;
pub mod ranking;

pub use compute::{compare, compute, Comparison, ComputeReport, ComputeResponse, TrustComputer};
pub use grants::{recommend_funding, GrantAllocation, GrantEngine, GrantReport, GrantRequest};
pub use graph::{Allocation, TrustGraph, TrustGraphBuilder, VertexId};
pub use jobs::{spawn_recompute, RecomputeHandle};
pub use params::PropagationParams;
pub use propagation::{DecoupledEngine, LocalTrustMatrix, PropagationResult, ScoreVector, StandardEngine};
pub use ranking::{DisplayScale, LinearScale, RankMapper, RankedScore};
