//! Flood-generator liveness sampling.
//!
//! Samples one representative host per attacker cluster and counts the
//! flood-generator processes observed there. Purely observational: no
//! resource state is ever mutated.

use std::sync::Arc;

use tracing::warn;

use floodlab_core::gateway::CommandGateway;
use floodlab_core::topology::HostRef;

/// Count the client-side generator processes on a host.
const COUNT_GENERATORS: &str = "ps aux | grep 'iperf -c' | grep -v grep | wc -l";

/// Result of one liveness sweep over the sampled hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessReport {
    /// At least one sampled host reports at least one process.
    pub live: bool,
    /// Processes observed across all sampled hosts.
    pub process_count: usize,
    /// Sampled hosts with at least one process.
    pub hosts_with_processes: usize,
}

pub struct AttackLivenessChecker {
    gateway: Arc<CommandGateway>,
}

impl AttackLivenessChecker {
    pub fn new(gateway: Arc<CommandGateway>) -> Self {
        Self { gateway }
    }

    /// Samples the given hosts (one per cluster) for running generators.
    pub async fn check(&self, sample_hosts: &[HostRef]) -> LivenessReport {
        let mut process_count = 0usize;
        let mut hosts_with_processes = 0usize;

        for host in sample_hosts {
            let observed = match self.gateway.execute(&host.id, COUNT_GENERATORS).await {
                Ok(output) => output.trim().parse::<usize>().unwrap_or(0),
                Err(err) => {
                    warn!(host = %host.id, %err, "liveness sample failed, counting zero");
                    0
                }
            };
            process_count += observed;
            if observed > 0 {
                hosts_with_processes += 1;
            }
        }

        LivenessReport {
            live: hosts_with_processes > 0 && process_count > 0,
            process_count,
            hosts_with_processes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use floodlab_core::error::CommandError;
    use floodlab_core::gateway::CommandExecutor;
    use floodlab_core::resource::ResourceId;
    use std::net::IpAddr;

    struct FixedCount(usize);

    #[async_trait]
    impl CommandExecutor for FixedCount {
        async fn run(&self, _command: &str) -> Result<String, CommandError> {
            Ok(format!("{}\n", self.0))
        }
    }

    fn host(id: &str) -> HostRef {
        HostRef {
            id: ResourceId::from(id),
            addr: "10.0.0.51".parse::<IpAddr>().unwrap(),
        }
    }

    #[tokio::test]
    async fn zero_processes_everywhere_is_not_live() {
        let gateway = Arc::new(CommandGateway::new([
            (
                ResourceId::from("a"),
                Arc::new(FixedCount(0)) as Arc<dyn CommandExecutor>,
            ),
            (
                ResourceId::from("b"),
                Arc::new(FixedCount(0)) as Arc<dyn CommandExecutor>,
            ),
        ]));
        let checker = AttackLivenessChecker::new(gateway);

        let report = checker.check(&[host("a"), host("b")]).await;
        assert!(!report.live);
        assert_eq!(report.process_count, 0);
        assert_eq!(report.hosts_with_processes, 0);
    }

    #[tokio::test]
    async fn one_busy_host_makes_the_attack_live() {
        let gateway = Arc::new(CommandGateway::new([
            (
                ResourceId::from("a"),
                Arc::new(FixedCount(0)) as Arc<dyn CommandExecutor>,
            ),
            (
                ResourceId::from("b"),
                Arc::new(FixedCount(16)) as Arc<dyn CommandExecutor>,
            ),
        ]));
        let checker = AttackLivenessChecker::new(gateway);

        let report = checker.check(&[host("a"), host("b")]).await;
        assert!(report.live);
        assert_eq!(report.process_count, 16);
        assert_eq!(report.hosts_with_processes, 1);
    }
}
