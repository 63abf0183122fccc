use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use floodlab_config::FloodlabConfig;
use floodlab_core::gateway::CommandGateway;
use floodlab_core::phase::Phase;
use floodlab_engine::ExperimentDriver;
use floodlab_sim::{OpenFlowControl, SimParams, SimTopology};
use floodlab_telemetry::MetricsRecorder;

use crate::sink::CsvResultSink;

#[derive(Parser)]
#[command(name = "floodlab", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full experiment against the simulated network
    Run(RunArgs),
    /// Run a single phase and print its summary
    Phase(PhaseArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Configuration file (defaults to config/floodlab.yaml + env)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory for the run's probe log and summary
    #[arg(short, long, default_value = "results")]
    pub output: PathBuf,
    /// Simulation seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct PhaseArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Phase label, e.g. BASELINE or ATTACK_TEMP_BAN
    #[arg(long)]
    pub phase: String,
    #[arg(long)]
    pub seed: Option<u64>,
}

fn load_config(path: &Option<PathBuf>) -> anyhow::Result<FloodlabConfig> {
    let config = match path {
        Some(path) => FloodlabConfig::load_from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => FloodlabConfig::load().context("loading configuration")?,
    };
    Ok(config)
}

fn build_stack(
    config: &FloodlabConfig,
    seed: Option<u64>,
) -> (SimTopology, ExperimentDriver, Arc<MetricsRecorder>) {
    let mut params = SimParams::default();
    if let Some(seed) = seed {
        params.seed = seed;
    }

    let topology = SimTopology::build(params);
    let gateway = Arc::new(CommandGateway::new(topology.executors()));
    let control = Arc::new(OpenFlowControl::new(gateway.clone()));
    let metrics = Arc::new(MetricsRecorder::new());
    let driver = ExperimentDriver::new(
        Arc::new(config.clone()),
        &topology,
        gateway,
        control,
        metrics.clone(),
    );
    (topology, driver, metrics)
}

fn phase_from_label(label: &str) -> anyhow::Result<Phase> {
    Phase::ORDERED
        .iter()
        .copied()
        .find(|p| p.label().eq_ignore_ascii_case(label))
        .ok_or_else(|| {
            let known: Vec<&str> = Phase::ORDERED.iter().map(|p| p.label()).collect();
            anyhow::anyhow!("unknown phase '{label}', expected one of {}", known.join(", "))
        })
}

pub async fn run_experiment(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let (_topology, driver, metrics) = build_stack(&config, args.seed);

    let run_dir = args
        .output
        .join(format!("run_{}", Local::now().format("%Y%m%d_%H%M%S")));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating {}", run_dir.display()))?;
    std::fs::write(
        run_dir.join("config.yaml"),
        serde_yaml::to_string(&config).context("serialising effective configuration")?,
    )?;

    let mut sink = CsvResultSink::create(&run_dir)?;
    let results = driver.run(&mut sink).await.context("experiment run")?;
    sink.write_summary(&results)?;

    if let Ok(metrics_text) = metrics.gather_metrics() {
        std::fs::write(run_dir.join("metrics.prom"), metrics_text)?;
    }

    info!(
        phases = results.len(),
        output = %run_dir.display(),
        "experiment complete"
    );
    Ok(())
}

pub async fn run_single_phase(args: PhaseArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let phase = phase_from_label(&args.phase)?;
    let (_topology, driver, _metrics) = build_stack(&config, args.seed);

    let result = driver.run_phase(phase, 1, 1).await;
    driver.stop_all_attacks().await;
    driver.reset_all_mitigations().await;

    println!("phase:    {}", result.phase.label());
    println!("probes:   {}", result.samples.len());
    println!(
        "timeouts: {} (errors: {})",
        result.summary.timeout_count, result.summary.error_count
    );
    match result.summary.mean_latency_ms {
        Some(mean) => println!("mean:     {mean:.2} ms"),
        None => println!("mean:     n/a (every probe timed out)"),
    }
    match result.summary.trigger_seq {
        Some(seq) => println!("trigger:  probe #{seq}"),
        None => println!("trigger:  never fired"),
    }
    Ok(())
}
