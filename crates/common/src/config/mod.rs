//! Configuration management for TrustGraph
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_DECAY_FACTOR, DEFAULT_MAX_ITERATIONS};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Trust propagation configuration
    #[serde(default)]
    pub engine: EngineSettings,

    /// Grant allocation configuration
    #[serde(default)]
    pub grants: GrantSettings,

    /// Rank/display mapping configuration
    #[serde(default)]
    pub display: DisplaySettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Which propagation strategy produces the user scores
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropagationMode {
    /// Coupled power iteration
    #[default]
    Standard,
    /// Per-vertex decoupled propagation
    Modified,
}

impl PropagationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropagationMode::Standard => "standard",
            PropagationMode::Modified => "modified",
        }
    }
}

/// How equal scores are ranked
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TiePolicy {
    /// Equal scores share a rank, the next distinct score gets rank + 1
    #[default]
    Dense,
    /// Every vertex gets its own rank, ties ordered by vertex id
    Ordinal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Weight of the pretrust prior in every iteration
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Iteration cap
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Max absolute per-vertex change that counts as converged
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    /// Propagation strategy
    #[serde(default)]
    pub mode: PropagationMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GrantSettings {
    /// Budget shared between applicants
    #[serde(default = "default_total_funding")]
    pub total_funding: f64,

    /// Floor applied independently to every recommendation
    #[serde(default = "default_minimum_grant_size")]
    pub minimum_grant_size: f64,

    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplaySettings {
    /// Display score given to the top-ranked vertex
    #[serde(default = "default_display_ceiling")]
    pub ceiling: f64,

    /// Tie handling when assigning ranks
    #[serde(default)]
    pub tie_policy: TiePolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name attached to log lines
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_decay_factor() -> f64 { DEFAULT_DECAY_FACTOR }
fn default_max_iterations() -> usize { DEFAULT_MAX_ITERATIONS }
fn default_convergence_threshold() -> f64 { DEFAULT_CONVERGENCE_THRESHOLD }
fn default_total_funding() -> f64 { 50_000.0 }
fn default_minimum_grant_size() -> f64 { 1_000.0 }
fn default_display_ceiling() -> f64 { 100.0 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "trustgraph".to_string() }

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            decay_factor: default_decay_factor(),
            max_iterations: default_max_iterations(),
            convergence_threshold: default_convergence_threshold(),
            mode: PropagationMode::default(),
        }
    }
}

impl Default for GrantSettings {
    fn default() -> Self {
        Self {
            total_funding: default_total_funding(),
            minimum_grant_size: default_minimum_grant_size(),
            decay_factor: default_decay_factor(),
            max_iterations: default_max_iterations(),
            convergence_threshold: default_convergence_threshold(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            ceiling: default_display_ceiling(),
            tie_policy: TiePolicy::default(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            grants: GrantSettings::default(),
            display: DisplaySettings::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__ENGINE__DECAY_FACTOR=0.2
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific configuration file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }
}
