//! Result sink seam.
//!
//! The engine produces ordered phase results; persistence and report
//! formats are owned by the sink implementation, not by the core.

use floodlab_core::report::PhaseResult;

pub trait ResultSink: Send {
    fn phase_completed(&mut self, result: &PhaseResult) -> std::io::Result<()>;
}

/// Discards results; useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn phase_completed(&mut self, _result: &PhaseResult) -> std::io::Result<()> {
        Ok(())
    }
}
