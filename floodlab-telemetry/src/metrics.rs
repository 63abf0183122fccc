//! Prometheus metrics for the experiment harness.

use prometheus::{Counter, Histogram, HistogramOpts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: prometheus::Registry,
    pub probes_total: prometheus::Counter,
    pub probe_timeouts_total: prometheus::Counter,
    pub probe_latency_ms: prometheus::Histogram,
    pub mitigations_applied_total: prometheus::Counter,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let probes_total =
            Counter::new("floodlab_probes_total", "Total reachability probes issued").unwrap();
        let probe_timeouts_total = Counter::new(
            "floodlab_probe_timeouts_total",
            "Probes without a parsable reply within the deadline",
        )
        .unwrap();

        let probe_latency_ms = Histogram::with_opts(
            HistogramOpts::new("floodlab_probe_latency_ms", "Probe round-trip latency")
                .buckets(vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 2000.0]),
        )
        .unwrap();

        let mitigations_applied_total = Counter::new(
            "floodlab_mitigations_applied_total",
            "Mitigation activations across the run",
        )
        .unwrap();

        registry.register(Box::new(probes_total.clone())).unwrap();
        registry
            .register(Box::new(probe_timeouts_total.clone()))
            .unwrap();
        registry
            .register(Box::new(probe_latency_ms.clone()))
            .unwrap();
        registry
            .register(Box::new(mitigations_applied_total.clone()))
            .unwrap();

        Self {
            registry,
            probes_total,
            probe_timeouts_total,
            probe_latency_ms,
            mitigations_applied_total,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_gathers() {
        let metrics = MetricsRecorder::new();
        metrics.probes_total.inc();
        metrics.probe_latency_ms.observe(12.5);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("floodlab_probes_total"));
        assert!(text.contains("floodlab_probe_latency_ms"));
    }
}
