//! TrustGraph Common Library
//!
//! Shared code for the TrustGraph engine crates:
//! - Error types and the failure envelope
//! - Configuration management
//! - Tracing subscriber setup
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod metrics;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, PropagationMode, TiePolicy};
pub use errors::{Result, TrustError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default decay factor (weight of the pretrust prior)
pub const DEFAULT_DECAY_FACTOR: f64 = 0.15;

/// Default iteration cap for every propagation loop
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default convergence threshold (max absolute per-vertex change)
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-6;
