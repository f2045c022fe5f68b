//! Propagation parameters

use serde::{Deserialize, Serialize};
use trustgraph_common::config::{EngineSettings, PropagationMode};
use trustgraph_common::errors::{Result, TrustError};
use trustgraph_common::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DECAY_FACTOR, DEFAULT_MAX_ITERATIONS};
use validator::Validate;

/// Parameters shared by the standard and decoupled engines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PropagationParams {
    /// Weight of the pretrust prior (alpha)
    #[serde(default = "default_decay_factor")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub decay_factor: f64,

    /// Iteration cap (M)
    #[serde(default = "default_max_iterations")]
    #[validate(range(min = 1))]
    pub max_iterations: usize,

    /// Max absolute per-vertex change that counts as converged (epsilon)
    #[serde(default = "default_convergence_threshold")]
    #[validate(range(exclusive_min = 0.0))]
    pub convergence_threshold: f64,

    /// Which engine produces the scores
    #[serde(default)]
    pub mode: PropagationMode,
}

fn default_decay_factor() -> f64 { DEFAULT_DECAY_FACTOR }
fn default_max_iterations() -> usize { DEFAULT_MAX_ITERATIONS }
fn default_convergence_threshold() -> f64 { DEFAULT_CONVERGENCE_THRESHOLD }

impl Default for PropagationParams {
    fn default() -> Self {
        Self {
            decay_factor: default_decay_factor(),
            max_iterations: default_max_iterations(),
            convergence_threshold: default_convergence_threshold(),
            mode: PropagationMode::default(),
        }
    }
}

impl PropagationParams {
    /// Same parameters with a different mode
    pub fn with_mode(self, mode: PropagationMode) -> Self {
        Self { mode, ..self }
    }

    /// Validate, returning the parameters unchanged on success
    pub fn validated(self) -> Result<Self> {
        // range checks let NaN through
        if !self.decay_factor.is_finite() || !self.convergence_threshold.is_finite() {
            return Err(TrustError::InvalidParameters {
                message: "decay factor and convergence threshold must be finite".to_string(),
            });
        }
        self.validate()?;
        Ok(self)
    }
}

impl From<&EngineSettings> for PropagationParams {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            decay_factor: settings.decay_factor,
            max_iterations: settings.max_iterations,
            convergence_threshold: settings.convergence_threshold,
            mode: settings.mode,
        }
    }
}
