//! # floodlab-core
//!
//! Foundation layer for the flood-mitigation experiment harness.
//! Everything the upper layers share lives here: resource identity, the
//! per-resource command gateway, probe classification, the phase/result
//! data model, and the attacker partition.
//!
//! ### Key Submodules:
//! - `gateway`: serialized command execution against remote resources
//! - `probe`: reachability probing and outcome classification
//! - `phase`: experiment phase taxonomy and per-phase mitigation selection
//! - `report`: immutable probe records and derived phase summaries
//! - `topology`: topology provider seam and whitelist-filtered partition
//! - `control`: switch control-plane seam (rules and meters)

pub mod control;
pub mod error;
pub mod gateway;
pub mod phase;
pub mod probe;
pub mod report;
pub mod resource;
pub mod topology;

pub use error::{CommandError, GatewayError};
pub use resource::ResourceId;
