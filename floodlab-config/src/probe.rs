//! Probe sequencing parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Parameters of the bounded probe sequence run in every phase.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ProbeConfig {
    /// Probes per phase.
    #[validate(range(min = 1, max = 10_000))]
    #[serde(default = "default_count")]
    pub count: usize,

    /// Fixed pacing between probes (milliseconds). Deliberate pacing,
    /// not backpressure.
    #[validate(range(min = 0, max = 60_000))]
    #[serde(default = "default_inter_probe_delay_ms")]
    pub inter_probe_delay_ms: u64,

    /// Per-probe reachability deadline (milliseconds).
    #[validate(range(min = 100, max = 60_000))]
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Preliminary probes sent by the phase pre-check.
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_precheck_probes")]
    pub precheck_probes: usize,
}

fn default_count() -> usize {
    40
}
fn default_inter_probe_delay_ms() -> u64 {
    200
}
fn default_deadline_ms() -> u64 {
    2000
}
fn default_precheck_probes() -> usize {
    3
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            inter_probe_delay_ms: default_inter_probe_delay_ms(),
            deadline_ms: default_deadline_ms(),
            precheck_probes: default_precheck_probes(),
        }
    }
}
