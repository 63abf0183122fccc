//! ## floodlab-telemetry
//! **Structured logging and experiment metrics**
//!
//! ### Components:
//! - `logging/`: tracing bootstrap + structured security events
//! - `metrics/`: Prometheus registry for probe and mitigation counters

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
