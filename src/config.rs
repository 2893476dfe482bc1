use std::io::Read;

use serde::{Deserialize, Serialize};

/// Holding cost per unit of ending inventory per period
pub const DEFAULT_HOLDING_RATE: f64 = 0.1;
/// Penalty per unit of unmet demand. Large enough that any feasible shipment is preferred.
pub const DEFAULT_UNMET_PENALTY: f64 = 1_000_000.0;

/// Objective constants of the planning model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub holding_rate: f64,
    pub unmet_penalty: f64,
    /// Cost per vehicle trip. Zero leaves trip counts free above the flow they must cover.
    pub trip_cost: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            holding_rate: DEFAULT_HOLDING_RATE,
            unmet_penalty: DEFAULT_UNMET_PENALTY,
            trip_cost: 0.0,
        }
    }
}

/// Settings handed to the solver backend as-is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub time_limit_secs: Option<f64>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub model: ModelConfig,
    pub solver: SolverConfig,
}

impl PlannerConfig {
    pub fn from_json(json: &str) -> serde_json::Result<PlannerConfig> {
        serde_json::from_str(json)
    }

    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<PlannerConfig> {
        serde_json::from_reader(reader)
    }
}
