//! Flood-generator parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Parameters for the TCP/UDP flood generators started in attack phases.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct AttackConfig {
    /// TCP flood sink port on the target.
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// UDP flood sink port on the target.
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// Parallel connections per attacker host.
    #[validate(range(min = 1, max = 128))]
    #[serde(default = "default_parallel_streams")]
    pub parallel_streams: u32,

    /// Offered UDP bandwidth per attacker host, e.g. `80M`.
    #[validate(custom(function = validation::validate_bandwidth))]
    #[serde(default = "default_udp_bandwidth")]
    pub udp_bandwidth: String,

    /// Generator lifetime per phase (seconds). Long enough that the flood
    /// never drains before the probe sequence finishes.
    #[validate(range(min = 10, max = 86_400))]
    #[serde(default = "default_phase_duration_secs")]
    pub phase_duration_secs: u64,
}

fn default_tcp_port() -> u16 {
    5001
}
fn default_udp_port() -> u16 {
    5002
}
fn default_parallel_streams() -> u32 {
    8
}
fn default_udp_bandwidth() -> String {
    "80M".into()
}
fn default_phase_duration_secs() -> u64 {
    600
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            tcp_port: default_tcp_port(),
            udp_port: default_udp_port(),
            parallel_streams: default_parallel_streams(),
            udp_bandwidth: default_udp_bandwidth(),
            phase_duration_secs: default_phase_duration_secs(),
        }
    }
}
