//! Mitigation enable flags and strategy parameters.
//!
//! The three flags select which defenses a run may use at all; phases
//! additionally select which of them they are allowed to trigger. To run
//! a single-defense experiment, enable exactly one flag.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Mitigation configuration, loaded once and immutable during a run.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct MitigationConfig {
    /// Enables threshold-block (deny rules on the designated switch).
    #[serde(default)]
    pub threshold_block_enabled: bool,

    /// Enables rate-limit (per-cluster meters).
    #[serde(default)]
    pub rate_limit_enabled: bool,

    /// Enables the self-expiring temporary ban.
    #[serde(default = "default_temp_ban_enabled")]
    pub temp_ban_enabled: bool,

    /// Meter rate per attacker cluster (kbit/s).
    #[validate(range(min = 8, max = 10_000_000))]
    #[serde(default = "default_rate_limit_kbps")]
    pub rate_limit_kbps: u32,

    /// Temporary-ban lifetime (seconds).
    #[validate(range(min = 1, max = 86_400))]
    #[serde(default = "default_ban_duration_secs")]
    pub ban_duration_secs: u64,

    /// Settle pause after mitigations are applied mid-phase (seconds).
    #[validate(range(min = 0, max = 60))]
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
}

fn default_temp_ban_enabled() -> bool {
    true
}
fn default_rate_limit_kbps() -> u32 {
    500
}
fn default_ban_duration_secs() -> u64 {
    60
}
fn default_settle_secs() -> u64 {
    2
}

impl Default for MitigationConfig {
    fn default() -> Self {
        Self {
            threshold_block_enabled: false,
            rate_limit_enabled: false,
            temp_ban_enabled: default_temp_ban_enabled(),
            rate_limit_kbps: default_rate_limit_kbps(),
            ban_duration_secs: default_ban_duration_secs(),
            settle_secs: default_settle_secs(),
        }
    }
}

impl MitigationConfig {
    /// Number of globally enabled mitigation strategies.
    pub fn enabled_count(&self) -> usize {
        [
            self.threshold_block_enabled,
            self.rate_limit_enabled,
            self.temp_ban_enabled,
        ]
        .iter()
        .filter(|&&flag| flag)
        .count()
    }
}
