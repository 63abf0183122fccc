//! CSV probe log and per-phase latency summary.
//!
//! One row per probe: `phase,cycle,attempt,seq,latency`, where latency is
//! the figure in milliseconds, `timeout`, or `error`. The summary mirrors
//! the statistics the offline plotting scripts consume.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use floodlab_core::report::PhaseResult;
use floodlab_engine::ResultSink;

pub struct CsvResultSink {
    ping_log: BufWriter<File>,
    summary_path: std::path::PathBuf,
}

impl CsvResultSink {
    pub fn create(dir: &Path) -> std::io::Result<Self> {
        let mut ping_log = BufWriter::new(File::create(dir.join("ping.csv"))?);
        writeln!(ping_log, "phase,cycle,attempt,seq,latency")?;
        Ok(Self {
            ping_log,
            summary_path: dir.join("summary.txt"),
        })
    }

    pub fn write_summary(&self, results: &[PhaseResult]) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(&self.summary_path)?);

        for result in results {
            let mut latencies: Vec<f64> = result
                .samples
                .iter()
                .filter_map(|s| s.outcome.latency_ms())
                .collect();

            if latencies.is_empty() {
                writeln!(
                    out,
                    "{}: no latency data ({} probes, all timeouts/errors)",
                    result.phase.label(),
                    result.samples.len()
                )?;
                continue;
            }

            latencies.sort_by(|a, b| a.partial_cmp(b).expect("finite latencies"));
            let n = latencies.len();
            let mean = latencies.iter().sum::<f64>() / n as f64;
            let median = latencies[n / 2];
            let p95 = if n >= 20 {
                latencies[(0.95 * n as f64) as usize - 1]
            } else {
                latencies[n - 1]
            };

            writeln!(
                out,
                "{}: n={}, mean={:.2}ms, median={:.2}ms, p95={:.2}ms, min={:.2}ms, max={:.2}ms, timeouts={}",
                result.phase.label(),
                n,
                mean,
                median,
                p95,
                latencies[0],
                latencies[n - 1],
                result.summary.timeout_count,
            )?;
        }
        Ok(())
    }
}

impl ResultSink for CsvResultSink {
    fn phase_completed(&mut self, result: &PhaseResult) -> std::io::Result<()> {
        for sample in &result.samples {
            writeln!(
                self.ping_log,
                "{},{},{},{},{}",
                result.phase.label(),
                result.cycle,
                result.attempt,
                sample.seq,
                sample.outcome
            )?;
        }
        self.ping_log.flush()
    }
}
