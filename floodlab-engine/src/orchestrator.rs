//! The per-phase state machine.
//!
//! One phase runs INIT → ATTACK_STARTED → PRECHECK → MONITORING →
//! PROBING → (MITIGATING, at most once) → DRAINING → DONE. All failures
//! below the phase level are absorbed here and downgraded to log
//! entries; a phase is never aborted mid-run by a single resource.

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use floodlab_config::FloodlabConfig;
use floodlab_core::phase::Phase;
use floodlab_core::probe::ProbeEngine;
use floodlab_core::report::{PhaseResult, ProbeSample};
use floodlab_core::topology::{AttackerPartition, HostRef};
use floodlab_detection::{BadSampleTracker, Detector};
use floodlab_mitigation::MitigationController;
use floodlab_telemetry::{EventLogger, MetricsRecorder};

use crate::attack::{AttackDriver, FloodProto};
use crate::monitor::ReachabilityMonitor;

/// Pause between attack start and probing so the flood actually loads
/// the path before the first sample.
const ATTACK_LOAD_SETTLE: Duration = Duration::from_secs(4);

/// Explicit orchestrator object holding the phase configuration and
/// run-time counters; `run_phase` is its single entry point.
pub struct PhaseOrchestrator {
    config: Arc<FloodlabConfig>,
    partition: Arc<AttackerPartition>,
    server: HostRef,
    probes: ProbeEngine,
    monitor_probes: ProbeEngine,
    detector: Detector,
    mitigations: Arc<MitigationController>,
    attack: Arc<AttackDriver>,
    metrics: Arc<MetricsRecorder>,
}

impl PhaseOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<FloodlabConfig>,
        partition: Arc<AttackerPartition>,
        server: HostRef,
        probes: ProbeEngine,
        monitor_probes: ProbeEngine,
        detector: Detector,
        mitigations: Arc<MitigationController>,
        attack: Arc<AttackDriver>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            config,
            partition,
            server,
            probes,
            monitor_probes,
            detector,
            mitigations,
            attack,
            metrics,
        }
    }

    /// Drives one phase end to end and returns its immutable record.
    #[instrument(skip_all, fields(phase = phase.label(), cycle = cycle))]
    pub async fn run_phase(&self, phase: Phase, cycle: usize, attempt: usize) -> PhaseResult {
        let detection = &self.config.detection;
        let inter_probe_delay = Duration::from_millis(self.config.probe.inter_probe_delay_ms);

        // INIT: force a known-clean starting state even if the previous
        // phase failed mid-way.
        info!("phase init: stopping generators and removing mitigations");
        self.attack.stop_all().await;
        self.mitigations.begin_phase();
        self.mitigations.remove_all().await;
        sleep(Duration::from_secs(1)).await;

        // ATTACK_STARTED
        if phase.has_attack() {
            let (tcp_started, tcp_failed) = self.attack.start_flood(FloodProto::Tcp).await;
            let (udp_started, udp_failed) = self.attack.start_flood(FloodProto::Udp).await;
            if tcp_failed + udp_failed > 0 {
                warn!(
                    tcp_started,
                    tcp_failed,
                    udp_started,
                    udp_failed,
                    "partial generator start, continuing with the attackers that came up"
                );
            }
            self.attack.verify_running().await;
        }

        // PRECHECK: diagnostic only, never gates phase execution.
        let sample_hosts = self.partition.sample_hosts();
        let precheck_detected = self
            .detector
            .precheck(phase.label(), self.server.addr, &sample_hosts)
            .await;
        info!(detected = precheck_detected, "pre-check complete");
        if !phase.has_attack() && precheck_detected {
            self.force_quiesce(&sample_hosts).await;
        }

        // MONITORING: background watcher with its own counter.
        let monitor = ReachabilityMonitor {
            probes: self.monitor_probes.clone(),
            target: self.server.addr,
            interval: Duration::from_millis(detection.monitor_interval_ms),
            consecutive_timeout_threshold: detection.consecutive_bad_threshold,
        }
        .spawn();

        if phase.has_attack() {
            sleep(ATTACK_LOAD_SETTLE).await;
        }

        // PROBING: the bounded numbered sequence, with a counter local to
        // this loop. The first time it reaches the threshold, and only
        // the first, mitigations are applied.
        let mut tracker = BadSampleTracker::new(detection.consecutive_bad_threshold);
        let mut samples: Vec<ProbeSample> = Vec::with_capacity(self.config.probe.count);
        let mut trigger_seq: Option<usize> = None;

        let mut sequence = self
            .probes
            .sequence(self.server.addr, self.config.probe.count, inter_probe_delay)
            .with_progress(|n, last| {
                info!(probe = n, last = %last, "probe progress");
            });

        while let Some(outcome) = sequence.next().await {
            let seq = sequence.issued();
            self.metrics.probes_total.inc();
            match outcome.latency_ms() {
                Some(ms) => self.metrics.probe_latency_ms.observe(ms),
                None => self.metrics.probe_timeouts_total.inc(),
            }

            let bad = outcome.is_bad(detection.bad_latency_threshold_ms);
            samples.push(ProbeSample { seq, outcome });

            if tracker.observe(bad) && trigger_seq.is_none() {
                // MITIGATING
                info!(
                    consecutive = tracker.consecutive(),
                    threshold_ms = detection.bad_latency_threshold_ms,
                    "activation criterion reached, applying configured mitigations"
                );
                let applied = self
                    .mitigations
                    .clone()
                    .apply_all(phase.selection())
                    .await;
                EventLogger::log_event(
                    "mitigations_applied",
                    vec![
                        KeyValue::new("phase", phase.label()),
                        KeyValue::new("probe_seq", seq as i64),
                        KeyValue::new(
                            "temp_ban_affected",
                            applied.temp_ban.map(|n| n as i64).unwrap_or(-1),
                        ),
                    ],
                )
                .await;
                self.metrics.mitigations_applied_total.inc();
                trigger_seq = Some(seq);
                sleep(Duration::from_secs(self.config.mitigation.settle_secs)).await;
            }
        }

        // Post-probing verdict, now with the monitor's flag in hand.
        let (active, reason) = self
            .detector
            .detect(&sample_hosts, Some(monitor.ping_failures()))
            .await;
        info!(active, %reason, "post-probing attack verdict");

        // DRAINING
        let joined = monitor
            .shutdown(Duration::from_millis(detection.monitor_join_timeout_ms))
            .await;
        if !joined {
            warn!("proceeding to cleanup without monitor join");
        }
        self.attack.stop_all().await;
        self.mitigations.remove_all().await;
        sleep(Duration::from_secs(
            self.config.experiment.inter_phase_cooldown_secs,
        ))
        .await;

        // DONE
        let summary =
            floodlab_core::report::PhaseSummary::from_samples(&samples, trigger_seq, precheck_detected);
        match summary.mean_latency_ms {
            Some(mean) => info!(
                mean_ms = %format!("{mean:.2}"),
                timeouts = summary.timeout_count,
                total = samples.len(),
                "phase complete"
            ),
            None => info!(
                timeouts = summary.timeout_count,
                total = samples.len(),
                "phase complete: every probe timed out"
            ),
        }

        PhaseResult {
            phase,
            cycle,
            attempt,
            samples,
            summary,
        }
    }

    /// Pre-check passthrough for the driver's lifecycle hooks.
    pub async fn run_precheck(&self, phase: Phase) -> bool {
        self.detector
            .precheck(phase.label(), self.server.addr, &self.partition.sample_hosts())
            .await
    }

    /// Baseline phases must start clean; if the pre-check still sees the
    /// attack, force-stop generators until liveness reports them dead.
    async fn force_quiesce(&self, sample_hosts: &[HostRef]) {
        warn!("attack detected during baseline pre-check, forcing extra cleanup");
        for attempt in 1..=3 {
            self.attack.stop_all().await;
            sleep(Duration::from_secs(1)).await;
            let report = self.detector.liveness(sample_hosts).await;
            info!(
                attempt,
                live = report.live,
                processes = report.process_count,
                "baseline cleanup check"
            );
            if !report.live {
                break;
            }
        }
    }
}
