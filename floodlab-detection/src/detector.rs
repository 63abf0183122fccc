//! The attack-detection decision table and the phase pre-check.

use std::net::IpAddr;
use std::time::Duration;

use tracing::info;

use floodlab_core::probe::ProbeEngine;
use floodlab_core::topology::HostRef;

use crate::liveness::{AttackLivenessChecker, LivenessReport};
use crate::sample::BadSampleTracker;

/// Why the detector reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionReason {
    /// No flood-generator processes observed on any sampled cluster.
    ProcessesDown,
    /// The background monitor reached its consecutive-timeout threshold.
    PingFailures,
    /// Generators are running but the ping-failure mechanism has not fired.
    GeneratorActive,
}

impl DetectionReason {
    pub fn label(&self) -> &'static str {
        match self {
            DetectionReason::ProcessesDown => "PROCESSES_DOWN",
            DetectionReason::PingFailures => "PING_FAILURES",
            DetectionReason::GeneratorActive => "GENERATOR_ACTIVE",
        }
    }
}

impl std::fmt::Display for DetectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Detector tuning, copied from the run configuration at construction.
#[derive(Debug, Clone)]
pub struct DetectorParams {
    pub bad_latency_threshold_ms: f64,
    pub consecutive_bad_threshold: usize,
    pub precheck_probes: usize,
    pub inter_probe_delay: Duration,
}

/// Combines generator liveness with the externally supplied ping-failure
/// flag into a single attack verdict.
pub struct Detector {
    liveness: AttackLivenessChecker,
    probes: ProbeEngine,
    params: DetectorParams,
}

impl Detector {
    pub fn new(liveness: AttackLivenessChecker, probes: ProbeEngine, params: DetectorParams) -> Self {
        Self {
            liveness,
            probes,
            params,
        }
    }

    /// Decision table, evaluated in order:
    /// 1. generators down ⇒ no attack, regardless of the flag;
    /// 2. ping-failure flag set ⇒ attack;
    /// 3. otherwise ⇒ attack (generators are producing load).
    ///
    /// `ping_failures` is `None` when no monitor is running (pre-check).
    pub async fn detect(
        &self,
        sample_hosts: &[HostRef],
        ping_failures: Option<bool>,
    ) -> (bool, DetectionReason) {
        let report = self.liveness.check(sample_hosts).await;

        if !report.live {
            info!(
                processes = report.process_count,
                hosts = report.hosts_with_processes,
                "detector: generator processes down"
            );
            return (false, DetectionReason::ProcessesDown);
        }

        if ping_failures == Some(true) {
            info!(
                processes = report.process_count,
                "detector: consecutive ping failures with generators running"
            );
            return (true, DetectionReason::PingFailures);
        }

        info!(
            processes = report.process_count,
            hosts = report.hosts_with_processes,
            "detector: generators active, ping-failure mechanism quiet"
        );
        (true, DetectionReason::GeneratorActive)
    }

    /// Exposes the underlying liveness sweep for diagnostics.
    pub async fn liveness(&self, sample_hosts: &[HostRef]) -> LivenessReport {
        self.liveness.check(sample_hosts).await
    }

    /// Diagnostic check run before a phase begins.
    ///
    /// Sends a small fixed number of preliminary probes, tracking bad
    /// samples with a counter local to this check. Reaching the
    /// consecutive-bad threshold short-circuits to `true` without
    /// consulting the decision table; otherwise the verdict falls back to
    /// [`Detector::detect`] with no ping-failure flag.
    pub async fn precheck(
        &self,
        phase_label: &str,
        target: IpAddr,
        sample_hosts: &[HostRef],
    ) -> bool {
        info!(
            phase = phase_label,
            probes = self.params.precheck_probes,
            "pre-check: sending preliminary probes"
        );

        let mut tracker = BadSampleTracker::new(self.params.consecutive_bad_threshold);
        let mut sequence = self.probes.sequence(
            target,
            self.params.precheck_probes,
            self.params.inter_probe_delay,
        );

        while let Some(outcome) = sequence.next().await {
            if tracker.observe(outcome.is_bad(self.params.bad_latency_threshold_ms)) {
                info!(
                    phase = phase_label,
                    consecutive = tracker.consecutive(),
                    "pre-check: bad-sample criterion reached, short-circuiting"
                );
                return true;
            }
        }

        let (detected, reason) = self.detect(sample_hosts, None).await;
        info!(phase = phase_label, detected, %reason, "pre-check verdict");
        detected
    }
}
