//! Per-phase mitigation bookkeeping.

/// The three defense strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MitigationKind {
    ThresholdBlock,
    RateLimit,
    TempBan,
}

impl MitigationKind {
    pub fn label(&self) -> &'static str {
        match self {
            MitigationKind::ThresholdBlock => "threshold-block",
            MitigationKind::RateLimit => "rate-limit",
            MitigationKind::TempBan => "temp-ban",
        }
    }
}

impl std::fmt::Display for MitigationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle of one strategy within one phase.
///
/// A strategy transitions `NotApplied → Applied` at most once per phase;
/// removal may happen any number of times and is always safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MitigationStatus {
    #[default]
    NotApplied,
    Applied,
    Removed,
}
