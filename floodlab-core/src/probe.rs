//! Reachability probing and outcome classification.
//!
//! A probe issues a single `ping` through the gateway and classifies the
//! raw output: a parsable latency figure yields `Latency`, absence of one
//! within the deadline yields `Timeout`, and any execution failure yields
//! `Error`. A probe never raises to the caller; classification failure
//! degrades to `Timeout` rather than being dropped.

use std::net::IpAddr;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::sleep;

use crate::gateway::CommandGateway;
use crate::resource::ResourceId;

static PING_LATENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)time[=<]\s*([\d.]+)\s*ms").expect("latency pattern"));

/// Outcome of a single reachability probe. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    /// Round-trip latency in milliseconds.
    Latency(f64),
    /// No parsable latency within the deadline.
    Timeout,
    /// The probe command itself failed to execute.
    Error(String),
}

impl ProbeOutcome {
    /// A sample is bad when it is a timeout, an execution error, or a
    /// latency at or above the threshold (boundary inclusive).
    pub fn is_bad(&self, bad_latency_threshold_ms: f64) -> bool {
        match self {
            ProbeOutcome::Latency(ms) => *ms >= bad_latency_threshold_ms,
            ProbeOutcome::Timeout | ProbeOutcome::Error(_) => true,
        }
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            ProbeOutcome::Latency(ms) => Some(*ms),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Latency(ms) => write!(f, "{ms:.2}"),
            ProbeOutcome::Timeout => f.write_str("timeout"),
            ProbeOutcome::Error(_) => f.write_str("error"),
        }
    }
}

/// Extracts the latency figure from a reachability-tool response.
pub fn parse_ping_latency(output: &str) -> Option<f64> {
    PING_LATENCY
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Issues probes from a fixed origin resource through the gateway.
#[derive(Clone)]
pub struct ProbeEngine {
    gateway: Arc<CommandGateway>,
    origin: ResourceId,
    deadline: Duration,
}

impl ProbeEngine {
    pub fn new(gateway: Arc<CommandGateway>, origin: ResourceId, deadline: Duration) -> Self {
        Self {
            gateway,
            origin,
            deadline,
        }
    }

    /// Single probe against `target`. Never fails; see module docs.
    pub async fn probe(&self, target: IpAddr) -> ProbeOutcome {
        let wait_secs = self.deadline.as_secs().max(1);
        let command = format!("ping -c 1 -W {wait_secs} {target}");
        match self.gateway.execute(&self.origin, &command).await {
            Ok(output) => match parse_ping_latency(&output) {
                Some(ms) => ProbeOutcome::Latency(ms),
                None => ProbeOutcome::Timeout,
            },
            Err(err) => ProbeOutcome::Error(err.to_string()),
        }
    }

    /// A finite, non-restartable probe sequence with fixed pacing.
    pub fn sequence(&self, target: IpAddr, count: usize, delay: Duration) -> ProbeSequence<'_> {
        ProbeSequence {
            engine: self,
            target,
            remaining: count,
            issued: 0,
            delay,
            on_progress: None,
        }
    }
}

/// Lazy sequence of probe outcomes, consumed synchronously by one caller.
pub struct ProbeSequence<'a> {
    engine: &'a ProbeEngine,
    target: IpAddr,
    remaining: usize,
    issued: usize,
    delay: Duration,
    on_progress: Option<Box<dyn FnMut(usize, &ProbeOutcome) + Send + 'a>>,
}

impl<'a> ProbeSequence<'a> {
    /// Installs a progress callback, invoked every 10th probe.
    pub fn with_progress(mut self, f: impl FnMut(usize, &ProbeOutcome) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Issues the next probe, or returns `None` when the sequence is spent.
    pub async fn next(&mut self) -> Option<ProbeOutcome> {
        if self.remaining == 0 {
            return None;
        }
        let outcome = self.engine.probe(self.target).await;
        self.remaining -= 1;
        self.issued += 1;

        if self.issued % 10 == 0 {
            if let Some(on_progress) = self.on_progress.as_mut() {
                on_progress(self.issued, &outcome);
            }
        }

        sleep(self.delay).await;
        Some(outcome)
    }

    pub fn issued(&self) -> usize {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;
    use crate::gateway::CommandExecutor;
    use async_trait::async_trait;
    use proptest::prelude::*;

    #[test]
    fn parses_standard_ping_output() {
        let out = "64 bytes from 10.0.0.10: icmp_seq=1 ttl=64 time=12.4 ms";
        assert_eq!(parse_ping_latency(out), Some(12.4));
    }

    #[test]
    fn parses_sub_millisecond_marker() {
        let out = "64 bytes from 10.0.0.10: icmp_seq=1 ttl=64 time<1 ms";
        assert_eq!(parse_ping_latency(out), Some(1.0));
    }

    #[test]
    fn rejects_output_without_latency() {
        let out = "1 packets transmitted, 0 received, 100% packet loss, time 0ms";
        assert_eq!(parse_ping_latency(out), None);
    }

    #[test]
    fn timeout_is_always_bad() {
        assert!(ProbeOutcome::Timeout.is_bad(0.0));
        assert!(ProbeOutcome::Timeout.is_bad(f64::MAX));
    }

    #[test]
    fn error_is_always_bad() {
        assert!(ProbeOutcome::Error("unreachable".into()).is_bad(f64::MAX));
    }

    #[test]
    fn latency_boundary_is_inclusive() {
        assert!(ProbeOutcome::Latency(500.0).is_bad(500.0));
        assert!(!ProbeOutcome::Latency(499.999).is_bad(500.0));
    }

    proptest! {
        #[test]
        fn badness_matches_threshold_rule(latency in 0.0f64..10_000.0, threshold in 0.0f64..10_000.0) {
            let outcome = ProbeOutcome::Latency(latency);
            prop_assert_eq!(outcome.is_bad(threshold), latency >= threshold);
        }

        #[test]
        fn timeout_bad_for_any_threshold(threshold in 0.0f64..10_000.0) {
            prop_assert!(ProbeOutcome::Timeout.is_bad(threshold));
        }
    }

    struct Scripted {
        outputs: std::sync::Mutex<Vec<Result<String, ()>>>,
    }

    #[async_trait]
    impl CommandExecutor for Scripted {
        async fn run(&self, _command: &str) -> Result<String, CommandError> {
            let next = self.outputs.lock().unwrap().remove(0);
            next.map_err(|_| CommandError::Unreachable("host down".into()))
        }
    }

    fn engine_with(outputs: Vec<Result<String, ()>>) -> ProbeEngine {
        let executor = Arc::new(Scripted {
            outputs: std::sync::Mutex::new(outputs),
        });
        let gateway = Arc::new(CommandGateway::new([(
            ResourceId::from("probe-origin"),
            executor as Arc<dyn CommandExecutor>,
        )]));
        ProbeEngine::new(gateway, ResourceId::from("probe-origin"), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn classifies_latency_timeout_and_error() {
        let engine = engine_with(vec![
            Ok("64 bytes from 10.0.0.10: time=3.1 ms".into()),
            Ok("100% packet loss".into()),
            Err(()),
        ]);
        let target: IpAddr = "10.0.0.10".parse().unwrap();

        assert_eq!(engine.probe(target).await, ProbeOutcome::Latency(3.1));
        assert_eq!(engine.probe(target).await, ProbeOutcome::Timeout);
        assert!(matches!(engine.probe(target).await, ProbeOutcome::Error(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_is_finite_and_reports_progress() {
        let outputs = (0..12)
            .map(|i| Ok(format!("64 bytes: time={}.0 ms", i + 1)))
            .collect();
        let engine = engine_with(outputs);
        let target: IpAddr = "10.0.0.10".parse().unwrap();

        let mut progress = Vec::new();
        let mut seq = engine
            .sequence(target, 12, Duration::from_millis(10))
            .with_progress(|n, _| progress.push(n));

        let mut total = 0;
        while seq.next().await.is_some() {
            total += 1;
        }
        assert_eq!(total, 12);
        drop(seq);
        assert_eq!(progress, vec![10]);
    }
}
