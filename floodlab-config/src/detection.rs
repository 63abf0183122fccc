//! Detection thresholds and background-monitor parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Attack-detection thresholds.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DetectionConfig {
    /// Unbroken bad samples required to fire detection/mitigation.
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_consecutive_bad_threshold")]
    pub consecutive_bad_threshold: usize,

    /// Latency at or above this value counts as a bad sample (ms).
    #[validate(range(min = 1.0, max = 60_000.0))]
    #[serde(default = "default_bad_latency_threshold_ms")]
    pub bad_latency_threshold_ms: f64,

    /// Background reachability-monitor sampling interval (ms). Also the
    /// bound on how long cancellation takes to observe.
    #[validate(range(min = 100, max = 10_000))]
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    /// Per-probe deadline used by the background monitor (ms).
    #[validate(range(min = 100, max = 10_000))]
    #[serde(default = "default_monitor_deadline_ms")]
    pub monitor_deadline_ms: u64,

    /// Bounded wait for the monitor to stop at phase teardown (ms).
    #[validate(range(min = 100, max = 30_000))]
    #[serde(default = "default_monitor_join_timeout_ms")]
    pub monitor_join_timeout_ms: u64,
}

fn default_consecutive_bad_threshold() -> usize {
    3
}
fn default_bad_latency_threshold_ms() -> f64 {
    500.0
}
fn default_monitor_interval_ms() -> u64 {
    1000
}
fn default_monitor_deadline_ms() -> u64 {
    1000
}
fn default_monitor_join_timeout_ms() -> u64 {
    1000
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            consecutive_bad_threshold: default_consecutive_bad_threshold(),
            bad_latency_threshold_ms: default_bad_latency_threshold_ms(),
            monitor_interval_ms: default_monitor_interval_ms(),
            monitor_deadline_ms: default_monitor_deadline_ms(),
            monitor_join_timeout_ms: default_monitor_join_timeout_ms(),
        }
    }
}
