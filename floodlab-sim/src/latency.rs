//! # Latency Models for the Simulated Network
//!
//! The server path degrades with offered load: latency rises steeply as
//! utilisation approaches the link capacity, and past saturation replies
//! are lost entirely.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Congestion-driven latency with uniform random jitter.
#[derive(Debug)]
pub struct CongestionLatencyModel {
    base_ms: f64,
    gain: f64,
    jitter_ms: f64,
    rng: SmallRng,
}

impl CongestionLatencyModel {
    pub fn new(base_ms: f64, gain: f64, jitter_ms: f64, seed: u64) -> Self {
        Self {
            base_ms,
            gain,
            jitter_ms,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Round-trip latency at the given utilisation, or `None` once the
    /// path is saturated and replies are dropped.
    pub fn sample(&mut self, utilization: f64) -> Option<f64> {
        if utilization >= 1.0 {
            return None;
        }
        let congestion = self.gain * utilization / (1.0 - utilization);
        let jitter = if self.jitter_ms > 0.0 {
            self.rng.random_range(0.0..self.jitter_ms)
        } else {
            0.0
        };
        Some(self.base_ms * (1.0 + congestion) + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_path_stays_near_base() {
        let mut model = CongestionLatencyModel::new(2.0, 30.0, 0.5, 7);
        let lat = model.sample(0.0).unwrap();
        assert!(lat >= 2.0 && lat <= 2.5);
    }

    #[test]
    fn latency_grows_with_utilization() {
        let mut model = CongestionLatencyModel::new(2.0, 30.0, 0.0, 7);
        let low = model.sample(0.1).unwrap();
        let high = model.sample(0.9).unwrap();
        assert!(high > low);
    }

    #[test]
    fn saturated_path_drops_replies() {
        let mut model = CongestionLatencyModel::new(2.0, 30.0, 0.0, 7);
        assert_eq!(model.sample(1.0), None);
        assert_eq!(model.sample(8.0), None);
    }
}
