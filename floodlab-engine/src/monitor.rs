//! Background reachability monitor.
//!
//! Samples the target once per interval on its own task, keeping a
//! consecutive-timeout counter fully independent of the probing loop's
//! counter. When the threshold is reached it sets the sticky
//! ping-failure flag: only the monitor ever writes it, and it is never
//! unset before phase teardown.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use floodlab_core::probe::{ProbeEngine, ProbeOutcome};

pub struct ReachabilityMonitor {
    pub probes: ProbeEngine,
    pub target: IpAddr,
    pub interval: Duration,
    pub consecutive_timeout_threshold: usize,
}

impl ReachabilityMonitor {
    /// Spawns the watch loop. Cancellation is cooperative: the stop flag
    /// is checked once per interval, so it is observed within one
    /// interval at most.
    pub fn spawn(self) -> MonitorHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let ping_failures = Arc::new(AtomicBool::new(false));

        let task = {
            let stop = stop.clone();
            let ping_failures = ping_failures.clone();
            tokio::spawn(async move {
                let mut consecutive = 0usize;
                while !stop.load(Ordering::SeqCst) {
                    match self.probes.probe(self.target).await {
                        ProbeOutcome::Latency(_) => consecutive = 0,
                        ProbeOutcome::Timeout | ProbeOutcome::Error(_) => {
                            consecutive += 1;
                            if consecutive >= self.consecutive_timeout_threshold
                                && !ping_failures.load(Ordering::SeqCst)
                            {
                                ping_failures.store(true, Ordering::SeqCst);
                                warn!(
                                    consecutive,
                                    "reachability monitor: consecutive timeouts reached, flag set"
                                );
                            }
                        }
                    }
                    sleep(self.interval).await;
                }
                debug!("reachability monitor stopped");
            })
        };

        MonitorHandle {
            stop,
            ping_failures,
            task,
        }
    }
}

pub struct MonitorHandle {
    stop: Arc<AtomicBool>,
    ping_failures: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Whether the sticky ping-failure flag has been set.
    pub fn ping_failures(&self) -> bool {
        self.ping_failures.load(Ordering::SeqCst)
    }

    /// Signals the monitor to stop and waits up to `join_timeout` for it
    /// to exit. Returns `false` on a join timeout; the caller proceeds
    /// to cleanup regardless.
    pub async fn shutdown(self, join_timeout: Duration) -> bool {
        self.stop.store(true, Ordering::SeqCst);
        match timeout(join_timeout, self.task).await {
            Ok(_) => true,
            Err(_) => {
                warn!("reachability monitor did not stop within the bounded join");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use floodlab_core::error::CommandError;
    use floodlab_core::gateway::{CommandExecutor, CommandGateway};
    use floodlab_core::resource::ResourceId;
    use std::sync::atomic::AtomicUsize;

    /// Answers the first `good` pings, then goes silent.
    struct Flaky {
        good: usize,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl CommandExecutor for Flaky {
        async fn run(&self, _command: &str) -> Result<String, CommandError> {
            let n = self.seen.fetch_add(1, Ordering::SeqCst);
            if n < self.good {
                Ok("64 bytes from 10.0.0.10: time=2.0 ms".into())
            } else {
                Ok("100% packet loss".into())
            }
        }
    }

    fn monitor_with(good: usize) -> MonitorHandle {
        let gateway = Arc::new(CommandGateway::new([(
            ResourceId::from("probe"),
            Arc::new(Flaky {
                good,
                seen: AtomicUsize::new(0),
            }) as Arc<dyn CommandExecutor>,
        )]));
        ReachabilityMonitor {
            probes: ProbeEngine::new(gateway, ResourceId::from("probe"), Duration::from_secs(1)),
            target: "10.0.0.10".parse().unwrap(),
            interval: Duration::from_millis(100),
            consecutive_timeout_threshold: 3,
        }
        .spawn()
    }

    #[tokio::test(start_paused = true)]
    async fn sets_flag_after_consecutive_timeouts() {
        let handle = monitor_with(2);
        // 2 good pings then silence; the flag needs 3 consecutive misses.
        sleep(Duration::from_millis(350)).await;
        assert!(!handle.ping_failures());
        sleep(Duration::from_millis(300)).await;
        assert!(handle.ping_failures());
        assert!(handle.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn flag_stays_clear_while_target_answers() {
        let handle = monitor_with(usize::MAX);
        sleep(Duration::from_secs(2)).await;
        assert!(!handle.ping_failures());
        assert!(handle.shutdown(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_is_observed_within_one_interval() {
        let handle = monitor_with(usize::MAX);
        sleep(Duration::from_millis(250)).await;
        assert!(handle.shutdown(Duration::from_millis(500)).await);
    }
}
