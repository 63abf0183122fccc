//! Run-level experiment parameters.

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Cycle sequencing and the legitimate-host whitelist.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ExperimentConfig {
    /// Number of full phase cycles to run.
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_cycles")]
    pub cycles: usize,

    /// Cooldown between phases (seconds).
    #[validate(range(min = 0, max = 600))]
    #[serde(default = "default_inter_phase_cooldown_secs")]
    pub inter_phase_cooldown_secs: u64,

    /// Cooldown between cycles (seconds).
    #[validate(range(min = 0, max = 600))]
    #[serde(default = "default_inter_cycle_cooldown_secs")]
    pub inter_cycle_cooldown_secs: u64,

    /// Address ranges that must never be treated as attackers. The
    /// probing origin and the target server are always added on top.
    #[validate(custom(function = validation::validate_cidr_list))]
    #[serde(default)]
    pub whitelist: Vec<IpNetwork>,
}

fn default_cycles() -> usize {
    1
}
fn default_inter_phase_cooldown_secs() -> u64 {
    5
}
fn default_inter_cycle_cooldown_secs() -> u64 {
    8
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            cycles: default_cycles(),
            inter_phase_cooldown_secs: default_inter_phase_cooldown_secs(),
            inter_cycle_cooldown_secs: default_inter_cycle_cooldown_secs(),
            whitelist: Vec::new(),
        }
    }
}
