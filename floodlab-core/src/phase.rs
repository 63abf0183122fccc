//! Experiment phase taxonomy.
//!
//! A run cycles through a fixed ordered set of phases: a clean baseline,
//! then flood phases differing only in which mitigations they are allowed
//! to trigger.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Normal traffic, no flood, no mitigations.
    Baseline,
    /// Flood active, every defense disabled.
    AttackUnmitigated,
    /// Flood active, threshold-block may trigger.
    AttackThresholdBlock,
    /// Flood active, rate-limit may trigger.
    AttackRateLimit,
    /// Flood active, temporary ban may trigger.
    AttackTempBan,
    /// Flood active, every enabled mitigation may trigger.
    AttackAll,
}

impl Phase {
    pub const ORDERED: [Phase; 6] = [
        Phase::Baseline,
        Phase::AttackUnmitigated,
        Phase::AttackThresholdBlock,
        Phase::AttackRateLimit,
        Phase::AttackTempBan,
        Phase::AttackAll,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Baseline => "BASELINE",
            Phase::AttackUnmitigated => "ATTACK_UNMITIGATED",
            Phase::AttackThresholdBlock => "ATTACK_THRESHOLD_BLOCK",
            Phase::AttackRateLimit => "ATTACK_RATE_LIMIT",
            Phase::AttackTempBan => "ATTACK_TEMP_BAN",
            Phase::AttackAll => "ATTACK_ALL",
        }
    }

    pub fn has_attack(&self) -> bool {
        !matches!(self, Phase::Baseline)
    }

    /// Which mitigations this phase may trigger when the activation
    /// criterion fires. Global enable flags are applied on top of this.
    pub fn selection(&self) -> MitigationSelection {
        match self {
            Phase::Baseline | Phase::AttackUnmitigated => MitigationSelection::NONE,
            Phase::AttackThresholdBlock => MitigationSelection {
                threshold_block: true,
                ..MitigationSelection::NONE
            },
            Phase::AttackRateLimit => MitigationSelection {
                rate_limit: true,
                ..MitigationSelection::NONE
            },
            Phase::AttackTempBan => MitigationSelection {
                temp_ban: true,
                ..MitigationSelection::NONE
            },
            Phase::AttackAll => MitigationSelection::ALL,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-phase mitigation request, intersected with the global enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationSelection {
    pub threshold_block: bool,
    pub rate_limit: bool,
    pub temp_ban: bool,
}

impl MitigationSelection {
    pub const NONE: Self = Self {
        threshold_block: false,
        rate_limit: false,
        temp_ban: false,
    };

    pub const ALL: Self = Self {
        threshold_block: true,
        rate_limit: true,
        temp_ban: true,
    };

    pub fn any(&self) -> bool {
        self.threshold_block || self.rate_limit || self.temp_ban
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_selects_nothing() {
        assert_eq!(Phase::Baseline.selection(), MitigationSelection::NONE);
        assert!(!Phase::Baseline.has_attack());
    }

    #[test]
    fn single_mitigation_phases_select_exactly_one() {
        let s = Phase::AttackTempBan.selection();
        assert!(s.temp_ban && !s.threshold_block && !s.rate_limit);

        let s = Phase::AttackRateLimit.selection();
        assert!(s.rate_limit && !s.threshold_block && !s.temp_ban);
    }

    #[test]
    fn attack_all_selects_everything() {
        assert_eq!(Phase::AttackAll.selection(), MitigationSelection::ALL);
    }
}
