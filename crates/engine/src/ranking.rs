//! Rank and display mapping
//!
//! Turns a raw score vector into presentation rows:
//! - Sorts by score descending, ties ordered by vertex id
//! - Assigns ranks starting at 1 (dense or ordinal)
//! - Maps scores onto a bounded display scale
//!
//! Raw scores are normalized by the maximum before scaling, so the top
//! vertex always lands on the ceiling.

use crate::graph::VertexId;
use crate::propagation::ScoreVector;
use serde::Serialize;
use trustgraph_common::config::{DisplaySettings, TiePolicy};

/// Pure mapping from a normalized score in `[0, 1]` to a display score
pub trait DisplayScale {
    fn display(&self, normalized: f64) -> f64;
}

impl<F> DisplayScale for F
where
    F: Fn(f64) -> f64,
{
    fn display(&self, normalized: f64) -> f64 {
        self(normalized)
    }
}

/// Linear mapping onto `[0, ceiling]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub ceiling: f64,
}

impl Default for LinearScale {
    fn default() -> Self {
        Self { ceiling: 100.0 }
    }
}

impl DisplayScale for LinearScale {
    fn display(&self, normalized: f64) -> f64 {
        normalized.clamp(0.0, 1.0) * self.ceiling
    }
}

/// One ranked vertex
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedScore<V> {
    pub id: V,
    pub raw_score: f64,
    pub display_score: f64,
    pub rank: usize,
}

/// Rank/display mapper
#[derive(Debug, Clone)]
pub struct RankMapper<S = LinearScale> {
    scale: S,
    tie_policy: TiePolicy,
}

impl Default for RankMapper<LinearScale> {
    fn default() -> Self {
        Self::new(LinearScale::default(), TiePolicy::Dense)
    }
}

impl RankMapper<LinearScale> {
    pub fn from_settings(settings: &DisplaySettings) -> Self {
        Self::new(
            LinearScale {
                ceiling: settings.ceiling,
            },
            settings.tie_policy,
        )
    }
}

impl<S: DisplayScale> RankMapper<S> {
    pub fn new(scale: S, tie_policy: TiePolicy) -> Self {
        Self { scale, tie_policy }
    }

    pub fn tie_policy(&self) -> TiePolicy {
        self.tie_policy
    }

    /// Rank every vertex in `scores`
    pub fn rank<V: VertexId>(&self, scores: &ScoreVector<V>) -> Vec<RankedScore<V>> {
        let mut sorted: Vec<(&V, f64)> = scores.iter().collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let max_score = sorted.first().map(|&(_, s)| s).unwrap_or(0.0);

        let mut ranked = Vec::with_capacity(sorted.len());
        let mut rank = 0;
        let mut previous: Option<f64> = None;

        for (position, (id, raw_score)) in sorted.into_iter().enumerate() {
            rank = match self.tie_policy {
                TiePolicy::Ordinal => position + 1,
                TiePolicy::Dense if previous == Some(raw_score) => rank,
                TiePolicy::Dense => rank + 1,
            };
            previous = Some(raw_score);

            let normalized = if max_score > 0.0 {
                raw_score / max_score
            } else {
                0.0
            };

            ranked.push(RankedScore {
                id: id.clone(),
                raw_score,
                display_score: self.scale.display(normalized),
                rank,
            });
        }

        ranked
    }
}
