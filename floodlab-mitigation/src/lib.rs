//! ## floodlab-mitigation
//! **Switch-level flood defenses**
//!
//! Three independently toggleable strategies with different lifetimes:
//! - `threshold/`: deny rules on one designated switch, until removed
//! - `rate_limit/`: per-cluster drop-band meters, until removed
//! - `ban/`: cluster-wide deny rules that self-expire
//!
//! The controller owns per-phase tri-state bookkeeping (not-applied,
//! applied, removed), guarantees at most one application per phase, and
//! keeps every removal idempotent so the ban-expiry timer may race phase
//! teardown in either order.

pub mod ban;
pub mod controller;
pub mod rate_limit;
pub mod state;
pub mod threshold;

pub use ban::TempBan;
pub use controller::{ApplyOutcome, EnabledMitigations, MitigationController};
pub use rate_limit::RateLimit;
pub use state::{MitigationKind, MitigationStatus};
pub use threshold::ThresholdBlock;
