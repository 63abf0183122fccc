//! Flood-generator lifecycle on the attacker hosts.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use floodlab_config::AttackConfig;
use floodlab_core::error::GatewayError;
use floodlab_core::gateway::CommandGateway;
use floodlab_core::topology::{AttackerPartition, HostRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodProto {
    Tcp,
    Udp,
}

impl FloodProto {
    pub fn label(&self) -> &'static str {
        match self {
            FloodProto::Tcp => "TCP",
            FloodProto::Udp => "UDP",
        }
    }
}

/// Starts and stops flood generators and the server-side traffic sinks.
pub struct AttackDriver {
    gateway: Arc<CommandGateway>,
    partition: Arc<AttackerPartition>,
    server: HostRef,
    config: AttackConfig,
}

impl AttackDriver {
    pub fn new(
        gateway: Arc<CommandGateway>,
        partition: Arc<AttackerPartition>,
        server: HostRef,
        config: AttackConfig,
    ) -> Self {
        Self {
            gateway,
            partition,
            server,
            config,
        }
    }

    /// Starts the TCP and UDP traffic sinks on the target and verifies
    /// they are listening. Returns `false` when verification fails.
    pub async fn start_sinks(&self) -> Result<bool, GatewayError> {
        self.gateway
            .execute(&self.server.id, "pkill -f '^iperf -s' || true")
            .await?;

        let tcp = format!(
            "ulimit -n 65535; nohup iperf -s -p {} > /tmp/iperf_tcp.log 2>&1 &",
            self.config.tcp_port
        );
        let udp = format!(
            "ulimit -n 65535; nohup iperf -s -u -p {} > /tmp/iperf_udp.log 2>&1 &",
            self.config.udp_port
        );
        self.gateway.execute(&self.server.id, &tcp).await?;
        self.gateway.execute(&self.server.id, &udp).await?;
        sleep(Duration::from_secs(2)).await;

        let check = format!(
            "netstat -tuln | egrep ':{}|:{}'",
            self.config.tcp_port, self.config.udp_port
        );
        let output = self.gateway.execute(&self.server.id, &check).await?;
        let tcp_ok = output.contains(&format!(":{}", self.config.tcp_port));
        let udp_ok = output.contains(&format!(":{}", self.config.udp_port));

        if tcp_ok && udp_ok {
            info!(server = %self.server.id, "flood sinks listening");
        } else {
            warn!(server = %self.server.id, tcp_ok, udp_ok, "flood sinks not listening");
        }
        Ok(tcp_ok && udp_ok)
    }

    fn generator_command(&self, host: &HostRef, proto: FloodProto) -> String {
        match proto {
            FloodProto::Tcp => format!(
                "iperf -c {} -p {} -t {} -P {} >> /tmp/{}_tcp.log 2>&1 &",
                self.server.addr,
                self.config.tcp_port,
                self.config.phase_duration_secs,
                self.config.parallel_streams,
                host.id
            ),
            FloodProto::Udp => format!(
                "iperf -c {} -u -p {} -t {} -P {} -b {} >> /tmp/{}_udp.log 2>&1 &",
                self.server.addr,
                self.config.udp_port,
                self.config.phase_duration_secs,
                self.config.parallel_streams,
                self.config.udp_bandwidth,
                host.id
            ),
        }
    }

    /// Starts one generator variant on every attacker host. Per-host
    /// failures are logged and do not abort the phase; partial attacker
    /// failure is itself an expected experimental condition.
    pub async fn start_flood(&self, proto: FloodProto) -> (usize, usize) {
        let mut started = 0usize;
        let mut failed = 0usize;

        for host in self.partition.all_hosts() {
            let command = self.generator_command(host, proto);
            match self.gateway.execute(&host.id, &command).await {
                Ok(_) => started += 1,
                Err(err) => {
                    failed += 1;
                    warn!(host = %host.id, %err, "generator start failed");
                }
            }
        }

        info!(
            proto = proto.label(),
            started,
            failed,
            streams_per_host = self.config.parallel_streams,
            "flood generators started"
        );
        (started, failed)
    }

    /// Samples one attacker and reports how many generator processes it
    /// is running.
    pub async fn verify_running(&self) -> usize {
        let Some(host) = self.partition.sample_hosts().into_iter().next() else {
            return 0;
        };
        let running = match self
            .gateway
            .execute(&host.id, "ps aux | grep 'iperf -c' | grep -v grep | wc -l")
            .await
        {
            Ok(output) => output.trim().parse::<usize>().unwrap_or(0),
            Err(err) => {
                warn!(host = %host.id, %err, "generator verification failed");
                0
            }
        };
        info!(host = %host.id, running, "generator check on sampled attacker");
        running
    }

    /// Kills every generator on every attacker host. Idempotent.
    pub async fn stop_all(&self) {
        for host in self.partition.all_hosts() {
            if let Err(err) = self
                .gateway
                .execute(&host.id, "killall -9 iperf 2>/dev/null || true")
                .await
            {
                warn!(host = %host.id, %err, "generator stop failed");
            }
        }
        info!("flood generators stopped on all attacker hosts");
    }
}
