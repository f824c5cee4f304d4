//! Configuration for the simulation engine and its binary.

use serde::Deserialize;

use bulwark_core::config::load_layered;
use bulwark_core::BulwarkError;
use bulwark_store::GraphConfig;

/// Simulation policy (`[simulation]` section, `BULWARK__SIMULATION__*`).
///
/// Defaults reproduce the standard scoring policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Own score at or above which a component falls regardless of how it
    /// was reached.
    #[serde(default = "default_compromise_threshold")]
    pub compromise_threshold: u32,

    /// Sensitivity level at or above which a risky component gets the
    /// sensitive-data finding.
    #[serde(default = "default_elevated_sensitivity")]
    pub elevated_sensitivity: u8,

    /// Upper clamp of the impact score. Values above 100 act as 100.
    #[serde(default = "default_max_impact_score")]
    pub max_impact_score: u32,

    /// Directory for audit records. Auditing is off when unset.
    #[serde(default)]
    pub audit_dir: Option<String>,
}

fn default_compromise_threshold() -> u32 {
    20
}

fn default_elevated_sensitivity() -> u8 {
    4
}

fn default_max_impact_score() -> u32 {
    100
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            compromise_threshold: default_compromise_threshold(),
            elevated_sensitivity: default_elevated_sensitivity(),
            max_impact_score: default_max_impact_score(),
            audit_dir: None,
        }
    }
}

/// Everything the `bulwark-sim` binary reads from `bulwark.toml` / env.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: GraphConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Load from the optional file `file_prefix` and `BULWARK__*` variables.
    pub fn load(file_prefix: &str) -> Result<Self, BulwarkError> {
        load_layered(file_prefix)
    }
}
