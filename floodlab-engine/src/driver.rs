//! Experiment driver: wires the components together, sequences phases
//! across cycles, and guarantees unconditional teardown.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use ipnetwork::IpNetwork;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use floodlab_config::FloodlabConfig;
use floodlab_core::control::SwitchControl;
use floodlab_core::gateway::CommandGateway;
use floodlab_core::phase::Phase;
use floodlab_core::probe::ProbeEngine;
use floodlab_core::report::PhaseResult;
use floodlab_core::resource::ResourceId;
use floodlab_core::topology::{AttackerPartition, ClusterId, HostRef, TopologyProvider};
use floodlab_detection::{AttackLivenessChecker, Detector, DetectorParams};
use floodlab_mitigation::{
    EnabledMitigations, MitigationController, RateLimit, TempBan, ThresholdBlock,
};
use floodlab_telemetry::MetricsRecorder;

use crate::attack::AttackDriver;
use crate::error::EngineError;
use crate::orchestrator::PhaseOrchestrator;
use crate::sink::ResultSink;

pub struct ExperimentDriver {
    config: Arc<FloodlabConfig>,
    gateway: Arc<CommandGateway>,
    partition: Arc<AttackerPartition>,
    origin: HostRef,
    server: HostRef,
    probes: ProbeEngine,
    attack: Arc<AttackDriver>,
    mitigations: Arc<MitigationController>,
    orchestrator: PhaseOrchestrator,
}

impl ExperimentDriver {
    /// Builds the full component stack from the topology and immutable
    /// configuration. The whitelist always contains the probing origin
    /// and the target server on top of the configured ranges.
    pub fn new(
        config: Arc<FloodlabConfig>,
        topology: &dyn TopologyProvider,
        gateway: Arc<CommandGateway>,
        control: Arc<dyn SwitchControl>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let origin = topology.probe_origin();
        let server = topology.server();

        let mut whitelist = config.experiment.whitelist.clone();
        whitelist.push(IpNetwork::from(origin.addr));
        whitelist.push(IpNetwork::from(server.addr));

        let partition = Arc::new(AttackerPartition::build(
            &topology.attacker_clusters(),
            &whitelist,
        ));

        let probes = ProbeEngine::new(
            gateway.clone(),
            origin.id.clone(),
            Duration::from_millis(config.probe.deadline_ms),
        );
        let monitor_probes = ProbeEngine::new(
            gateway.clone(),
            origin.id.clone(),
            Duration::from_millis(config.detection.monitor_deadline_ms),
        );

        let detector = Detector::new(
            AttackLivenessChecker::new(gateway.clone()),
            probes.clone(),
            DetectorParams {
                bad_latency_threshold_ms: config.detection.bad_latency_threshold_ms,
                consecutive_bad_threshold: config.detection.consecutive_bad_threshold,
                precheck_probes: config.probe.precheck_probes,
                inter_probe_delay: Duration::from_millis(config.probe.inter_probe_delay_ms),
            },
        );

        let attack = Arc::new(AttackDriver::new(
            gateway.clone(),
            partition.clone(),
            server.clone(),
            config.attack.clone(),
        ));

        let edge_switches = topology.edge_switches();
        let clusters: BTreeMap<ClusterId, (ResourceId, Vec<IpAddr>)> = partition
            .clusters()
            .iter()
            .filter_map(|(&id, hosts)| {
                edge_switches.get(&id).map(|switch| {
                    (
                        id,
                        (switch.clone(), hosts.iter().map(|h| h.addr).collect()),
                    )
                })
            })
            .collect();

        let mitigations = Arc::new(MitigationController::new(
            ThresholdBlock::new(
                control.clone(),
                topology.threshold_switch(),
                partition.cluster_addrs(topology.threshold_cluster()),
                server.addr,
            ),
            RateLimit::new(
                control.clone(),
                clusters.clone(),
                server.addr,
                config.mitigation.rate_limit_kbps,
            ),
            TempBan::new(control, clusters, server.addr),
            EnabledMitigations {
                threshold_block: config.mitigation.threshold_block_enabled,
                rate_limit: config.mitigation.rate_limit_enabled,
                temp_ban: config.mitigation.temp_ban_enabled,
            },
            Duration::from_secs(config.mitigation.ban_duration_secs),
        ));

        let orchestrator = PhaseOrchestrator::new(
            config.clone(),
            partition.clone(),
            server.clone(),
            probes.clone(),
            monitor_probes,
            detector,
            mitigations.clone(),
            attack.clone(),
            metrics,
        );

        Self {
            config,
            gateway,
            partition,
            origin,
            server,
            probes,
            attack,
            mitigations,
            orchestrator,
        }
    }

    /// The phases this run will execute, derived from the enable flags.
    /// A skipped phase is logged with the flag that disabled it.
    pub fn phase_plan(&self) -> Vec<Phase> {
        let flags = &self.config.mitigation;
        let mut plan = vec![Phase::Baseline, Phase::AttackUnmitigated];

        if flags.threshold_block_enabled {
            plan.push(Phase::AttackThresholdBlock);
        } else {
            info!("phase ATTACK_THRESHOLD_BLOCK skipped: threshold_block_enabled = false");
        }
        if flags.rate_limit_enabled {
            plan.push(Phase::AttackRateLimit);
        } else {
            info!("phase ATTACK_RATE_LIMIT skipped: rate_limit_enabled = false");
        }
        if flags.temp_ban_enabled {
            plan.push(Phase::AttackTempBan);
        } else {
            info!("phase ATTACK_TEMP_BAN skipped: temp_ban_enabled = false");
        }
        if flags.enabled_count() >= 2 {
            plan.push(Phase::AttackAll);
        } else {
            info!("phase ATTACK_ALL skipped: fewer than two mitigations enabled");
        }
        plan
    }

    /// Runs the full experiment. Whatever happens inside, generators are
    /// stopped and mitigations removed before this returns.
    #[instrument(skip_all)]
    pub async fn run(&self, sink: &mut dyn ResultSink) -> Result<Vec<PhaseResult>, EngineError> {
        self.log_banner();

        let outcome = self.run_cycles(sink).await;
        if let Err(err) = &outcome {
            error!(%err, "experiment failed, proceeding to unconditional teardown");
        }
        self.stop_all_attacks().await;
        self.reset_all_mitigations().await;
        outcome
    }

    async fn run_cycles(&self, sink: &mut dyn ResultSink) -> Result<Vec<PhaseResult>, EngineError> {
        self.prime_routes().await;

        if !self.attack.start_sinks().await? {
            return Err(EngineError::SinkServices(self.server.id.clone()));
        }

        let plan = self.phase_plan();
        let cycles = self.config.experiment.cycles;
        let mut results = Vec::with_capacity(plan.len() * cycles);
        let mut attempt = 1usize;

        for cycle in 1..=cycles {
            info!(cycle, total = cycles, "cycle start");
            for &phase in &plan {
                let result = self.orchestrator.run_phase(phase, cycle, attempt).await;
                sink.phase_completed(&result)?;
                results.push(result);
                attempt += 1;
            }
            info!(cycle, total = cycles, "cycle complete");
            if cycle < cycles {
                sleep(Duration::from_secs(
                    self.config.experiment.inter_cycle_cooldown_secs,
                ))
                .await;
            }
        }

        Ok(results)
    }

    /// Warm-up pings so first-phase samples measure the path, not ARP
    /// resolution. Failures here are reported but never fatal.
    async fn prime_routes(&self) {
        info!("priming routes");
        let warmup = format!("ping -c 2 -W 1 {} > /dev/null 2>&1", self.server.addr);
        if let Err(err) = self.gateway.execute(&self.origin.id, &warmup).await {
            warn!(%err, "origin warm-up ping failed");
        }
        for host in self.partition.sample_hosts() {
            let warmup = format!("ping -c 1 -W 1 {} > /dev/null 2>&1", self.server.addr);
            if let Err(err) = self.gateway.execute(&host.id, &warmup).await {
                warn!(host = %host.id, %err, "attacker warm-up ping failed");
            }
        }

        match self.probes.probe(self.server.addr).await.latency_ms() {
            Some(ms) => info!(latency_ms = %format!("{ms:.2}"), "connectivity to target OK"),
            None => warn!("limited connectivity to target, continuing anyway"),
        }
    }

    fn log_banner(&self) {
        let flags = &self.config.mitigation;
        info!(
            cycles = self.config.experiment.cycles,
            attackers = self.partition.total_attackers(),
            clusters = self.partition.clusters().len(),
            probes_per_phase = self.config.probe.count,
            consecutive_bad_threshold = self.config.detection.consecutive_bad_threshold,
            bad_latency_threshold_ms = self.config.detection.bad_latency_threshold_ms,
            threshold_block = flags.threshold_block_enabled,
            rate_limit = flags.rate_limit_enabled,
            temp_ban = flags.temp_ban_enabled,
            ban_duration_secs = flags.ban_duration_secs,
            "flood mitigation experiment starting"
        );
    }

    /// Runs a single phase outside the cycle plan.
    pub async fn run_phase(&self, phase: Phase, cycle: usize, attempt: usize) -> PhaseResult {
        self.orchestrator.run_phase(phase, cycle, attempt).await
    }

    /// Lifecycle hook: diagnostic pre-check outside a phase run.
    pub async fn run_precheck(&self, phase: Phase) -> bool {
        self.orchestrator.run_precheck(phase).await
    }

    /// Lifecycle hook: idempotent removal of every mitigation.
    pub async fn reset_all_mitigations(&self) {
        self.mitigations.remove_all().await;
    }

    /// Lifecycle hook: idempotent stop of every flood generator.
    pub async fn stop_all_attacks(&self) {
        self.attack.stop_all().await;
    }
}
