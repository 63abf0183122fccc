//! Per-resource command interpreters.
//!
//! Hosts and switches accept the same textual commands a real deployment
//! would run; the executors parse them and mutate the shared world. Every
//! command arrives through the gateway, so per-resource serialization is
//! exercised exactly as in a real run.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use floodlab_core::error::CommandError;
use floodlab_core::gateway::CommandExecutor;
use floodlab_core::resource::ResourceId;

use crate::world::{FlowAction, FlowRule, Proto, SimWorld};

static PING_CMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ping -c \d+ -W (\d+) ([\d.]+)").expect("ping pattern"));
static LISTEN_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-p (\d+)").expect("port pattern"));

static ADD_FLOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"add-flow \S+ 'priority=(\d+),(tcp|udp),nw_src=([\d.]+),nw_dst=([\d.]+),actions=(.+)'",
    )
    .expect("add-flow pattern")
});
static DEL_FLOWS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"del-flows \S+ 'priority=(\d+),(tcp|udp),nw_src=([\d.]+),nw_dst=([\d.]+)'")
        .expect("del-flows pattern")
});
static ADD_METER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"add-meter \S+ 'meter=(\d+),kbps,band=type=drop,rate=(\d+)'")
        .expect("add-meter pattern")
});
static DEL_METERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"del-meters \S+ 'meter=(\d+)'").expect("del-meters pattern"));

fn unknown(command: &str) -> CommandError {
    CommandError::NonZeroExit {
        status: 127,
        detail: format!("command not found: {command}"),
    }
}

fn parse_proto(s: &str) -> Proto {
    if s == "udp" {
        Proto::Udp
    } else {
        Proto::Tcp
    }
}

/// Command interpreter for one emulated host.
pub struct SimHostExecutor {
    world: SimWorld,
    host: ResourceId,
}

impl SimHostExecutor {
    pub fn new(world: SimWorld, host: ResourceId) -> Self {
        Self { world, host }
    }

    fn ping(&self, deadline_secs: u64, target: &str) -> Result<String, CommandError> {
        let target = target
            .parse()
            .map_err(|_| CommandError::Unreachable(format!("bad address: {target}")))?;
        let deadline_ms = (deadline_secs * 1000) as f64;

        Ok(match self.world.ping_latency(target) {
            Some(latency) if latency < deadline_ms => format!(
                "PING {target} 56(84) bytes of data.\n\
                 64 bytes from {target}: icmp_seq=1 ttl=64 time={latency:.2} ms\n\
                 \n--- ping statistics ---\n\
                 1 packets transmitted, 1 received, 0% packet loss"
            ),
            _ => format!(
                "PING {target} 56(84) bytes of data.\n\
                 \n--- ping statistics ---\n\
                 1 packets transmitted, 0 received, 100% packet loss"
            ),
        })
    }
}

#[async_trait]
impl CommandExecutor for SimHostExecutor {
    async fn run(&self, command: &str) -> Result<String, CommandError> {
        if let Some(caps) = PING_CMD.captures(command) {
            let deadline: u64 = caps[1].parse().unwrap_or(1);
            return self.ping(deadline, &caps[2]);
        }

        // The generator-count pipeline greps for client processes.
        if command.contains("wc -l") {
            return Ok(format!("{}\n", self.world.flood_count(&self.host)));
        }

        if command.contains("pkill") && command.contains("iperf -s") {
            self.world.stop_listening(&self.host);
            return Ok(String::new());
        }

        if command.contains("iperf -s") {
            if let Some(caps) = LISTEN_PORT.captures(command) {
                let port: u16 = caps[1].parse().unwrap_or(0);
                self.world.listen(&self.host, port);
            }
            return Ok(String::new());
        }

        if command.contains("netstat") {
            let lines: Vec<String> = self
                .world
                .listen_ports(&self.host)
                .iter()
                .map(|p| format!("tcp        0      0 0.0.0.0:{p}            0.0.0.0:*               LISTEN"))
                .collect();
            return Ok(lines.join("\n"));
        }

        if command.contains("killall") {
            self.world.stop_floods(&self.host);
            return Ok(String::new());
        }

        if command.contains("iperf -c") {
            let proto = if command.contains(" -u ") || command.contains(" -u\t") {
                Proto::Udp
            } else {
                Proto::Tcp
            };
            self.world.start_flood(&self.host, proto);
            return Ok(String::new());
        }

        Err(unknown(command))
    }
}

/// Command interpreter for one emulated switch.
pub struct SimSwitchExecutor {
    world: SimWorld,
    switch: ResourceId,
}

impl SimSwitchExecutor {
    pub fn new(world: SimWorld, switch: ResourceId) -> Self {
        Self { world, switch }
    }
}

#[async_trait]
impl CommandExecutor for SimSwitchExecutor {
    async fn run(&self, command: &str) -> Result<String, CommandError> {
        if let Some(caps) = ADD_FLOW.captures(command) {
            let action = match &caps[5] {
                "drop" => FlowAction::Drop,
                "NORMAL" => FlowAction::Normal,
                other => match other
                    .strip_prefix("meter:")
                    .and_then(|rest| rest.split(',').next())
                    .and_then(|id| id.parse().ok())
                {
                    Some(id) => FlowAction::Meter(id),
                    None => {
                        return Err(CommandError::NonZeroExit {
                            status: 1,
                            detail: format!("bad actions: {other}"),
                        })
                    }
                },
            };
            self.world.add_flow(
                &self.switch,
                FlowRule {
                    priority: caps[1].parse().unwrap_or(0),
                    proto: parse_proto(&caps[2]),
                    nw_src: caps[3].parse().map_err(|_| unknown(command))?,
                    nw_dst: caps[4].parse().map_err(|_| unknown(command))?,
                    action,
                },
            );
            return Ok(String::new());
        }

        if let Some(caps) = DEL_FLOWS.captures(command) {
            self.world.del_flows(
                &self.switch,
                caps[1].parse().unwrap_or(0),
                parse_proto(&caps[2]),
                caps[3].parse().map_err(|_| unknown(command))?,
                caps[4].parse().map_err(|_| unknown(command))?,
            );
            return Ok(String::new());
        }

        if let Some(caps) = ADD_METER.captures(command) {
            self.world.add_meter(
                &self.switch,
                caps[1].parse().unwrap_or(0),
                caps[2].parse().unwrap_or(0),
            );
            return Ok(String::new());
        }

        if let Some(caps) = DEL_METERS.captures(command) {
            self.world.del_meter(&self.switch, caps[1].parse().unwrap_or(0));
            return Ok(String::new());
        }

        if command.contains("dump-flows") {
            let dump: Vec<String> = self
                .world
                .flows(&self.switch)
                .iter()
                .map(|r| {
                    format!(
                        "priority={},{},nw_src={},nw_dst={} actions={:?}",
                        r.priority,
                        r.proto.label(),
                        r.nw_src,
                        r.nw_dst,
                        r.action
                    )
                })
                .collect();
            return Ok(dump.join("\n"));
        }

        Err(unknown(command))
    }
}
