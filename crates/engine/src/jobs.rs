//! Background recomputation
//!
//! Recomputes run on tokio's blocking pool so the decoupled engine never
//! stalls an async executor. Triggers are fire-and-forget: there is no queue,
//! dedupe or cancellation, and the caller decides which finished report to
//! persist (the snapshot fingerprint says which graph each one came from).

use crate::compute::{ComputeReport, TrustComputer};
use crate::graph::{TrustGraph, VertexId};
use crate::ranking::DisplayScale;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info_span};
use trustgraph_common::errors::{Result, TrustError};

/// Handle to an in-flight recomputation
///
/// Dropping the handle detaches the job; it still runs to completion.
pub struct RecomputeHandle<V> {
    fingerprint: String,
    task: JoinHandle<ComputeReport<V>>,
}

impl<V: VertexId> RecomputeHandle<V> {
    /// Fingerprint of the snapshot being computed
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the report
    pub async fn join(self) -> Result<ComputeReport<V>> {
        self.task.await.map_err(|e| {
            error!(fingerprint = %self.fingerprint, error = %e, "Recompute job failed");
            TrustError::Internal {
                message: format!("recompute job for snapshot {} failed: {}", self.fingerprint, e),
            }
        })
    }
}

/// Spawn a recomputation of `graph` on the blocking pool
///
/// Must be called from within a tokio runtime.
pub fn spawn_recompute<V, S>(computer: Arc<TrustComputer<S>>, graph: Arc<TrustGraph<V>>) -> RecomputeHandle<V>
where
    V: VertexId,
    S: DisplayScale + Send + Sync + 'static,
{
    let fingerprint = graph.fingerprint();
    let span = info_span!(
        "recompute",
        fingerprint = %fingerprint,
        vertices = graph.vertex_count()
    );

    let task = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        computer.compute(&*graph)
    });

    RecomputeHandle { fingerprint, task }
}

/// Spawn one job per snapshot, in order
///
/// Jobs are independent; a later snapshot may finish first.
pub fn spawn_all<V, S>(
    computer: &Arc<TrustComputer<S>>,
    snapshots: impl IntoIterator<Item = Arc<TrustGraph<V>>>,
) -> Vec<RecomputeHandle<V>>
where
    V: VertexId,
    S: DisplayScale + Send + Sync + 'static,
{
    snapshots
        .into_iter()
        .map(|graph| spawn_recompute(Arc::clone(computer), graph))
        .collect()
}
