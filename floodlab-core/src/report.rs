//! Immutable probe records and the derived per-phase summary.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::probe::ProbeOutcome;

/// One numbered probe outcome within a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSample {
    /// 1-based sequence number within the phase.
    pub seq: usize,
    pub outcome: ProbeOutcome,
}

/// Derived statistics for one executed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    /// Mean over latency samples only; `None` when every probe timed out
    /// or errored (distinct from a mean of zero).
    pub mean_latency_ms: Option<f64>,
    pub timeout_count: usize,
    pub error_count: usize,
    /// 1-based sequence number of the probe whose bad run fired the
    /// mitigation trigger, if it fired.
    pub trigger_seq: Option<usize>,
    /// Diagnostic pre-check verdict (never gates phase execution).
    pub precheck_detected: bool,
}

impl PhaseSummary {
    pub fn from_samples(
        samples: &[ProbeSample],
        trigger_seq: Option<usize>,
        precheck_detected: bool,
    ) -> Self {
        let latencies: Vec<f64> = samples
            .iter()
            .filter_map(|s| s.outcome.latency_ms())
            .collect();
        let mean_latency_ms = if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
        };
        let timeout_count = samples
            .iter()
            .filter(|s| matches!(s.outcome, ProbeOutcome::Timeout))
            .count();
        let error_count = samples
            .iter()
            .filter(|s| matches!(s.outcome, ProbeOutcome::Error(_)))
            .count();

        Self {
            mean_latency_ms,
            timeout_count,
            error_count,
            trigger_seq,
            precheck_detected,
        }
    }
}

/// Full record of one executed phase, appended to the run-wide log and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: Phase,
    /// 1-based cycle number.
    pub cycle: usize,
    /// Global attempt index, increments per executed phase across the run.
    pub attempt: usize,
    pub samples: Vec<ProbeSample>,
    pub summary: PhaseSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: usize, outcome: ProbeOutcome) -> ProbeSample {
        ProbeSample { seq, outcome }
    }

    #[test]
    fn mean_ignores_timeouts() {
        let samples = vec![
            sample(1, ProbeOutcome::Latency(10.0)),
            sample(2, ProbeOutcome::Timeout),
            sample(3, ProbeOutcome::Latency(20.0)),
        ];
        let summary = PhaseSummary::from_samples(&samples, None, false);
        assert_eq!(summary.mean_latency_ms, Some(15.0));
        assert_eq!(summary.timeout_count, 1);
    }

    #[test]
    fn all_timeouts_yields_no_mean() {
        let samples = vec![
            sample(1, ProbeOutcome::Timeout),
            sample(2, ProbeOutcome::Timeout),
        ];
        let summary = PhaseSummary::from_samples(&samples, None, false);
        assert_eq!(summary.mean_latency_ms, None);
        assert_eq!(summary.timeout_count, 2);
    }

    #[test]
    fn errors_counted_separately_from_timeouts() {
        let samples = vec![
            sample(1, ProbeOutcome::Error("down".into())),
            sample(2, ProbeOutcome::Timeout),
            sample(3, ProbeOutcome::Latency(5.0)),
        ];
        let summary = PhaseSummary::from_samples(&samples, Some(2), false);
        assert_eq!(summary.timeout_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.trigger_seq, Some(2));
    }
}
