//! Simulator configuration.
//!
//! Every field has a default, so an empty JSON object (or `SimConfig::default()`)
//! gives the canonical behavior: a 400-step limit, startup sanity checks on the
//! first 20 recalculations and the index-based group strategy.

use crate::{
    consts::{DEFAULT_CIRCUIT_NAME, DEFAULT_SANITY_CHECK_WINDOW, DEFAULT_STEP_LIMIT},
    error::Result,
    strategy::StrategyKind,
};
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Circuit name reported in convergence diagnostics.
    pub name: String,
    /// Generations allowed per `recalculate` before giving up.
    pub step_limit: usize,
    /// Number of initial `recalculate` calls that verify the dirty markers were cleared.
    pub sanity_check_window: usize,
    pub strategy: StrategyKind,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            name: DEFAULT_CIRCUIT_NAME.to_owned(),
            step_limit: DEFAULT_STEP_LIMIT,
            sanity_check_window: DEFAULT_SANITY_CHECK_WINDOW,
            strategy: StrategyKind::Indexed,
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn named(name: &str) -> Self {
        SimConfig {
            name: name.to_owned(),
            ..SimConfig::default()
        }
    }
}
