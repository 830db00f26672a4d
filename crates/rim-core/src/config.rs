//! Configuration for the RIM analysis engine.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`RIM__` prefix, `__` section separator)
//! 2. Config file (`rim.toml` by default)
//! 3. Defaults

use serde::{Deserialize, Serialize};

use crate::error::{Result, RimError};

/// Upper bound on any configured traversal depth.
pub const MAX_TRAVERSAL_HOPS: usize = 32;

/// Top-level analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub exposure: ExposureConfig,
    #[serde(default)]
    pub influence: InfluenceConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
}

/// Fixed-point relaxation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExposureConfig {
    /// Stop once the largest per-risk residual change in a pass is below this.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Hard cap on relaxation passes.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

/// Influence network analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfluenceConfig {
    /// Propagation BFS depth limit (default 5).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Per-hop decay for propagation scores (default 0.85).
    #[serde(default = "default_decay")]
    pub decay: f64,

    #[serde(default = "default_ranked_limit")]
    pub propagator_limit: usize,

    #[serde(default = "default_ranked_limit")]
    pub convergence_limit: usize,

    #[serde(default = "default_critical_path_limit")]
    pub critical_path_limit: usize,

    #[serde(default = "default_ranked_limit")]
    pub bottleneck_limit: usize,

    /// Minimum undirected density for a component to count as a cluster.
    #[serde(default = "default_min_density")]
    pub min_cluster_density: f64,

    /// Maximum influence hops in an enumerated risk → objective path.
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,

    /// Cap on the number of paths enumerated for critical paths and bottlenecks.
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

/// Mitigation coverage parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageConfig {
    /// Effective mitigation factor at or below which a risk is well covered.
    #[serde(default = "default_well_covered")]
    pub well_covered_threshold: f64,
}

fn default_epsilon() -> f64 {
    1e-4
}

fn default_max_iterations() -> usize {
    50
}

fn default_max_depth() -> usize {
    5
}

fn default_decay() -> f64 {
    0.85
}

fn default_ranked_limit() -> usize {
    10
}

fn default_critical_path_limit() -> usize {
    5
}

fn default_min_density() -> f64 {
    0.5
}

fn default_max_path_length() -> usize {
    8
}

fn default_max_paths() -> usize {
    10_000
}

fn default_well_covered() -> f64 {
    0.3
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            decay: default_decay(),
            propagator_limit: default_ranked_limit(),
            convergence_limit: default_ranked_limit(),
            critical_path_limit: default_critical_path_limit(),
            bottleneck_limit: default_ranked_limit(),
            min_cluster_density: default_min_density(),
            max_path_length: default_max_path_length(),
            max_paths: default_max_paths(),
        }
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            well_covered_threshold: default_well_covered(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from `<file_prefix>.{toml,json,yaml}` (optional)
    /// layered under `RIM__` environment variables.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = ::config::Config::builder()
            .add_source(::config::File::with_name(file_prefix).required(false))
            .add_source(
                ::config::Environment::with_prefix("RIM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: AnalysisConfig = cfg.try_deserialize()?;
        loaded.validate()?;
        tracing::debug!(file_prefix, ?loaded, "Loaded analysis configuration");
        Ok(loaded)
    }

    /// Reject parameter combinations that would make the analyses meaningless.
    pub fn validate(&self) -> Result<()> {
        let e = &self.exposure;
        if !(e.epsilon.is_finite() && e.epsilon > 0.0) {
            return Err(RimError::Config(format!(
                "exposure.epsilon must be a positive number, got {}",
                e.epsilon
            )));
        }
        if e.max_iterations == 0 {
            return Err(RimError::Config(
                "exposure.max_iterations must be at least 1".to_string(),
            ));
        }

        let i = &self.influence;
        if !(i.decay > 0.0 && i.decay <= 1.0) {
            return Err(RimError::Config(format!(
                "influence.decay must be in (0, 1], got {}",
                i.decay
            )));
        }
        if i.max_paths == 0 {
            return Err(RimError::Config(
                "influence.max_paths must be at least 1".to_string(),
            ));
        }
        if i.max_depth > MAX_TRAVERSAL_HOPS || i.max_path_length > MAX_TRAVERSAL_HOPS {
            return Err(RimError::Config(format!(
                "influence.max_depth and influence.max_path_length must be at most {MAX_TRAVERSAL_HOPS}, got {} and {}",
                i.max_depth, i.max_path_length
            )));
        }
        if !(0.0..=1.0).contains(&i.min_cluster_density) {
            return Err(RimError::Config(format!(
                "influence.min_cluster_density must be in [0, 1], got {}",
                i.min_cluster_density
            )));
        }

        let c = &self.coverage;
        if !(0.0..=1.0).contains(&c.well_covered_threshold) {
            return Err(RimError::Config(format!(
                "coverage.well_covered_threshold must be in [0, 1], got {}",
                c.well_covered_threshold
            )));
        }

        Ok(())
    }
}
