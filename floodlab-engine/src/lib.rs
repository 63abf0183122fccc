//! Experiment engine: the phase orchestrator state machine, the
//! background reachability monitor, flood-generator lifecycle, and the
//! cycle-sequencing experiment driver.

pub mod attack;
pub mod driver;
pub mod error;
pub mod monitor;
pub mod orchestrator;
pub mod sink;

pub use attack::{AttackDriver, FloodProto};
pub use driver::ExperimentDriver;
pub use error::EngineError;
pub use monitor::{MonitorHandle, ReachabilityMonitor};
pub use orchestrator::PhaseOrchestrator;
pub use sink::{NullSink, ResultSink};
