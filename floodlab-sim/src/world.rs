//! Shared state of the simulated network.
//!
//! One mutex-protected world holds every host's generator processes,
//! every switch's flow table and meters, and the congestion model for
//! the server path. Executors mutate it through narrow methods; tests
//! inspect it directly.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;

use floodlab_core::resource::ResourceId;

use crate::latency::CongestionLatencyModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proto {
    Tcp,
    Udp,
}

impl Proto {
    pub fn label(&self) -> &'static str {
        match self {
            Proto::Tcp => "tcp",
            Proto::Udp => "udp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAction {
    Drop,
    Meter(u32),
    Normal,
}

/// One installed flow rule. Matching is exact on protocol and the
/// source/destination pair; higher priority wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRule {
    pub priority: u16,
    pub proto: Proto,
    pub nw_src: IpAddr,
    pub nw_dst: IpAddr,
    pub action: FlowAction,
}

#[derive(Debug, Default)]
struct SwitchState {
    flows: Vec<FlowRule>,
    meters: BTreeMap<u32, u32>,
}

#[derive(Debug)]
struct HostState {
    addr: IpAddr,
    floods: Vec<Proto>,
    listen_ports: Vec<u16>,
}

struct WorldState {
    hosts: BTreeMap<ResourceId, HostState>,
    switches: BTreeMap<ResourceId, SwitchState>,
    /// Edge switch carrying each host's traffic toward the server.
    edge_of: BTreeMap<ResourceId, ResourceId>,
    server_addr: IpAddr,
    offered_kbps_per_generator: u64,
    capacity_kbps: u64,
    latency: CongestionLatencyModel,
}

/// Handle to the shared world; cheap to clone.
#[derive(Clone)]
pub struct SimWorld {
    inner: Arc<Mutex<WorldState>>,
}

impl SimWorld {
    pub fn new(
        server_addr: IpAddr,
        offered_kbps_per_generator: u64,
        capacity_kbps: u64,
        latency: CongestionLatencyModel,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WorldState {
                hosts: BTreeMap::new(),
                switches: BTreeMap::new(),
                edge_of: BTreeMap::new(),
                server_addr,
                offered_kbps_per_generator,
                capacity_kbps,
                latency,
            })),
        }
    }

    pub fn add_host(&self, id: ResourceId, addr: IpAddr, edge: Option<ResourceId>) {
        let mut state = self.inner.lock();
        state.hosts.insert(
            id.clone(),
            HostState {
                addr,
                floods: Vec::new(),
                listen_ports: Vec::new(),
            },
        );
        if let Some(edge) = edge {
            state.edge_of.insert(id, edge);
        }
    }

    pub fn add_switch(&self, id: ResourceId) {
        self.inner.lock().switches.insert(id, SwitchState::default());
    }

    // ---- host side ------------------------------------------------------

    pub fn start_flood(&self, host: &ResourceId, proto: Proto) {
        if let Some(h) = self.inner.lock().hosts.get_mut(host) {
            h.floods.push(proto);
        }
    }

    pub fn stop_floods(&self, host: &ResourceId) {
        if let Some(h) = self.inner.lock().hosts.get_mut(host) {
            h.floods.clear();
        }
    }

    pub fn flood_count(&self, host: &ResourceId) -> usize {
        self.inner
            .lock()
            .hosts
            .get(host)
            .map(|h| h.floods.len())
            .unwrap_or(0)
    }

    pub fn listen(&self, host: &ResourceId, port: u16) {
        if let Some(h) = self.inner.lock().hosts.get_mut(host) {
            if !h.listen_ports.contains(&port) {
                h.listen_ports.push(port);
            }
        }
    }

    pub fn stop_listening(&self, host: &ResourceId) {
        if let Some(h) = self.inner.lock().hosts.get_mut(host) {
            h.listen_ports.clear();
        }
    }

    pub fn listen_ports(&self, host: &ResourceId) -> Vec<u16> {
        self.inner
            .lock()
            .hosts
            .get(host)
            .map(|h| h.listen_ports.clone())
            .unwrap_or_default()
    }

    // ---- switch side ----------------------------------------------------

    pub fn add_flow(&self, switch: &ResourceId, rule: FlowRule) {
        if let Some(sw) = self.inner.lock().switches.get_mut(switch) {
            sw.flows.push(rule);
        }
    }

    /// Deletes every rule matching the (priority, proto, src, dst) tuple.
    /// Deleting an absent rule is a no-op.
    pub fn del_flows(
        &self,
        switch: &ResourceId,
        priority: u16,
        proto: Proto,
        nw_src: IpAddr,
        nw_dst: IpAddr,
    ) {
        if let Some(sw) = self.inner.lock().switches.get_mut(switch) {
            sw.flows.retain(|r| {
                !(r.priority == priority
                    && r.proto == proto
                    && r.nw_src == nw_src
                    && r.nw_dst == nw_dst)
            });
        }
    }

    pub fn add_meter(&self, switch: &ResourceId, meter_id: u32, rate_kbps: u32) {
        if let Some(sw) = self.inner.lock().switches.get_mut(switch) {
            sw.meters.insert(meter_id, rate_kbps);
        }
    }

    pub fn del_meter(&self, switch: &ResourceId, meter_id: u32) {
        if let Some(sw) = self.inner.lock().switches.get_mut(switch) {
            sw.meters.remove(&meter_id);
        }
    }

    pub fn flows(&self, switch: &ResourceId) -> Vec<FlowRule> {
        self.inner
            .lock()
            .switches
            .get(switch)
            .map(|sw| sw.flows.clone())
            .unwrap_or_default()
    }

    /// Deny rules currently installed across all switches, for test
    /// assertions about mitigation state.
    pub fn total_deny_rules(&self) -> usize {
        self.inner
            .lock()
            .switches
            .values()
            .flat_map(|sw| sw.flows.iter())
            .filter(|r| r.action == FlowAction::Drop)
            .count()
    }

    pub fn total_meters(&self) -> usize {
        self.inner.lock().switches.values().map(|sw| sw.meters.len()).sum()
    }

    // ---- the congested server path --------------------------------------

    /// Round-trip latency toward `target`, or `None` when the reply is
    /// lost to congestion. Paths other than the server's are uncontended.
    pub fn ping_latency(&self, target: IpAddr) -> Option<f64> {
        let mut state = self.inner.lock();
        if target != state.server_addr {
            return state.latency.sample(0.0);
        }
        let utilization = state.utilization();
        state.latency.sample(utilization)
    }
}

impl WorldState {
    /// Offered load toward the server over link capacity. Each generator
    /// process offers a fixed rate; a matching drop rule silences it and
    /// a matching meter caps its group at the meter rate.
    fn utilization(&self) -> f64 {
        let mut offered: u64 = 0;
        let mut metered: BTreeMap<(ResourceId, u32), u64> = BTreeMap::new();

        for (host_id, host) in &self.hosts {
            let edge = match self.edge_of.get(host_id) {
                Some(edge) => edge,
                None => continue,
            };
            let table = match self.switches.get(edge) {
                Some(sw) => sw,
                None => continue,
            };

            for &proto in &host.floods {
                let verdict = table
                    .flows
                    .iter()
                    .filter(|r| {
                        r.proto == proto && r.nw_src == host.addr && r.nw_dst == self.server_addr
                    })
                    .max_by_key(|r| r.priority)
                    .map(|r| r.action)
                    .unwrap_or(FlowAction::Normal);

                match verdict {
                    FlowAction::Drop => {}
                    FlowAction::Normal => offered += self.offered_kbps_per_generator,
                    FlowAction::Meter(id) => {
                        *metered.entry((edge.clone(), id)).or_default() +=
                            self.offered_kbps_per_generator;
                    }
                }
            }
        }

        for ((switch, meter_id), group_offered) in metered {
            let rate = self
                .switches
                .get(&switch)
                .and_then(|sw| sw.meters.get(&meter_id).copied())
                .unwrap_or(0) as u64;
            offered += group_offered.min(rate);
        }

        offered as f64 / self.capacity_kbps as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> SimWorld {
        let server: IpAddr = "10.0.0.10".parse().unwrap();
        // No jitter so assertions are exact.
        let latency = CongestionLatencyModel::new(2.0, 30.0, 0.0, 1);
        let w = SimWorld::new(server, 80_000, 1_000_000, latency);
        w.add_switch(ResourceId::from("leaf1"));
        w.add_host(ResourceId::from("probe"), "10.0.0.150".parse().unwrap(), None);
        for n in 1..=10u8 {
            let id = ResourceId::new(format!("atk1-{n}"));
            w.add_host(
                id.clone(),
                format!("10.0.0.{}", 50 + n).parse().unwrap(),
                Some(ResourceId::from("leaf1")),
            );
        }
        w
    }

    fn flood_everyone(w: &SimWorld) {
        for n in 1..=10u8 {
            let id = ResourceId::new(format!("atk1-{n}"));
            w.start_flood(&id, Proto::Tcp);
            w.start_flood(&id, Proto::Udp);
        }
    }

    #[test]
    fn idle_network_answers_at_base_latency() {
        let w = world();
        let lat = w.ping_latency("10.0.0.10".parse().unwrap()).unwrap();
        assert!((lat - 2.0).abs() < 1e-9);
    }

    #[test]
    fn full_flood_saturates_the_server_path() {
        let w = world();
        flood_everyone(&w);
        // 10 hosts × 2 generators × 80 Mbit/s ≫ 1 Gbit/s capacity.
        assert_eq!(w.ping_latency("10.0.0.10".parse().unwrap()), None);
    }

    #[test]
    fn deny_rules_restore_the_path() {
        let w = world();
        flood_everyone(&w);
        let server: IpAddr = "10.0.0.10".parse().unwrap();
        for n in 1..=10u8 {
            let src: IpAddr = format!("10.0.0.{}", 50 + n).parse().unwrap();
            for proto in [Proto::Tcp, Proto::Udp] {
                w.add_flow(
                    &ResourceId::from("leaf1"),
                    FlowRule {
                        priority: 300,
                        proto,
                        nw_src: src,
                        nw_dst: server,
                        action: FlowAction::Drop,
                    },
                );
            }
        }
        let lat = w.ping_latency(server).unwrap();
        assert!((lat - 2.0).abs() < 1e-9);
        assert_eq!(w.total_deny_rules(), 20);
    }

    #[test]
    fn meters_cap_offered_load() {
        let w = world();
        flood_everyone(&w);
        let server: IpAddr = "10.0.0.10".parse().unwrap();
        w.add_meter(&ResourceId::from("leaf1"), 1001, 500);
        for n in 1..=10u8 {
            let src: IpAddr = format!("10.0.0.{}", 50 + n).parse().unwrap();
            for proto in [Proto::Tcp, Proto::Udp] {
                w.add_flow(
                    &ResourceId::from("leaf1"),
                    FlowRule {
                        priority: 200,
                        proto,
                        nw_src: src,
                        nw_dst: server,
                        action: FlowAction::Meter(1001),
                    },
                );
            }
        }
        // The whole cluster is squeezed through a 500 kbit/s meter.
        let lat = w.ping_latency(server).unwrap();
        assert!(lat < 3.0, "expected near-base latency, got {lat}");
    }

    #[test]
    fn higher_priority_rule_wins() {
        let w = world();
        let server: IpAddr = "10.0.0.10".parse().unwrap();
        let src: IpAddr = "10.0.0.51".parse().unwrap();
        w.start_flood(&ResourceId::from("atk1-1"), Proto::Tcp);

        w.add_flow(
            &ResourceId::from("leaf1"),
            FlowRule {
                priority: 100,
                proto: Proto::Tcp,
                nw_src: src,
                nw_dst: server,
                action: FlowAction::Normal,
            },
        );
        w.add_flow(
            &ResourceId::from("leaf1"),
            FlowRule {
                priority: 300,
                proto: Proto::Tcp,
                nw_src: src,
                nw_dst: server,
                action: FlowAction::Drop,
            },
        );

        let lat = w.ping_latency(server).unwrap();
        assert!((lat - 2.0).abs() < 1e-9);
    }
}
