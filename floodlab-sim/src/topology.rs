//! The clustered attacker topology.
//!
//! Mirrors the physical experiment layout: N attacker clusters of M hosts
//! each, one edge switch per cluster, a target server, and a probing
//! origin. Addressing follows the `10.0.0.x` scheme with attackers
//! starting at `.51`.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::info;

use floodlab_core::gateway::CommandExecutor;
use floodlab_core::resource::ResourceId;
use floodlab_core::topology::{ClusterId, HostRef, TopologyProvider};

use crate::executor::{SimHostExecutor, SimSwitchExecutor};
use crate::latency::CongestionLatencyModel;
use crate::world::SimWorld;

/// Build parameters for the simulated topology.
#[derive(Debug, Clone)]
pub struct SimParams {
    pub clusters: u32,
    pub hosts_per_cluster: u32,
    /// Cluster targeted by threshold-block.
    pub threshold_cluster: ClusterId,
    pub base_latency_ms: f64,
    pub jitter_ms: f64,
    /// Congestion steepness of the server path.
    pub congestion_gain: f64,
    /// Offered load of one generator process (kbit/s).
    pub offered_kbps_per_generator: u64,
    /// Server link capacity (kbit/s).
    pub capacity_kbps: u64,
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            clusters: 5,
            hosts_per_cluster: 10,
            threshold_cluster: 4,
            base_latency_ms: 2.0,
            jitter_ms: 0.5,
            congestion_gain: 30.0,
            offered_kbps_per_generator: 80_000,
            capacity_kbps: 1_000_000,
            seed: 42,
        }
    }
}

/// The built topology: world state plus the resource grouping the core
/// consumes through [`TopologyProvider`].
pub struct SimTopology {
    world: SimWorld,
    clusters: BTreeMap<ClusterId, Vec<HostRef>>,
    edge_switches: BTreeMap<ClusterId, ResourceId>,
    server: HostRef,
    origin: HostRef,
    threshold_cluster: ClusterId,
}

impl SimTopology {
    pub fn build(params: SimParams) -> Self {
        let server_addr: IpAddr = "10.0.0.10".parse().expect("server address");
        let origin_addr: IpAddr = "10.0.0.150".parse().expect("origin address");

        let latency = CongestionLatencyModel::new(
            params.base_latency_ms,
            params.congestion_gain,
            params.jitter_ms,
            params.seed,
        );
        let world = SimWorld::new(
            server_addr,
            params.offered_kbps_per_generator,
            params.capacity_kbps,
            latency,
        );

        let server = HostRef {
            id: ResourceId::from("srv1"),
            addr: server_addr,
        };
        let origin = HostRef {
            id: ResourceId::from("probe"),
            addr: origin_addr,
        };
        world.add_host(server.id.clone(), server.addr, None);
        world.add_host(origin.id.clone(), origin.addr, None);

        let mut clusters = BTreeMap::new();
        let mut edge_switches = BTreeMap::new();

        for cluster in 1..=params.clusters {
            let edge = ResourceId::new(format!("leaf{cluster}"));
            world.add_switch(edge.clone());
            edge_switches.insert(cluster, edge.clone());

            let mut hosts = Vec::with_capacity(params.hosts_per_cluster as usize);
            for n in 1..=params.hosts_per_cluster {
                let last_octet = 50 + (cluster - 1) * params.hosts_per_cluster + n;
                let addr: IpAddr = format!("10.0.0.{last_octet}").parse().expect("host address");
                let id = ResourceId::new(format!("atk{cluster}-{n}"));
                world.add_host(id.clone(), addr, Some(edge.clone()));
                hosts.push(HostRef { id, addr });
            }
            clusters.insert(cluster, hosts);
        }

        info!(
            clusters = params.clusters,
            hosts_per_cluster = params.hosts_per_cluster,
            attackers = params.clusters * params.hosts_per_cluster,
            "simulated topology built"
        );

        Self {
            world,
            clusters,
            edge_switches,
            server,
            origin,
            threshold_cluster: params.threshold_cluster,
        }
    }

    /// One command executor per resource, for the gateway registry.
    pub fn executors(&self) -> Vec<(ResourceId, Arc<dyn CommandExecutor>)> {
        let mut executors: Vec<(ResourceId, Arc<dyn CommandExecutor>)> = Vec::new();

        for host in self
            .clusters
            .values()
            .flatten()
            .chain([&self.server, &self.origin])
        {
            executors.push((
                host.id.clone(),
                Arc::new(SimHostExecutor::new(self.world.clone(), host.id.clone())),
            ));
        }
        for switch in self.edge_switches.values() {
            executors.push((
                switch.clone(),
                Arc::new(SimSwitchExecutor::new(self.world.clone(), switch.clone())),
            ));
        }
        executors
    }

    /// Direct world access for inspection in tests and reports.
    pub fn world(&self) -> &SimWorld {
        &self.world
    }
}

impl TopologyProvider for SimTopology {
    fn attacker_clusters(&self) -> BTreeMap<ClusterId, Vec<HostRef>> {
        self.clusters.clone()
    }

    fn server(&self) -> HostRef {
        self.server.clone()
    }

    fn probe_origin(&self) -> HostRef {
        self.origin.clone()
    }

    fn edge_switches(&self) -> BTreeMap<ClusterId, ResourceId> {
        self.edge_switches.clone()
    }

    fn threshold_switch(&self) -> ResourceId {
        self.edge_switches
            .get(&self.threshold_cluster)
            .cloned()
            .unwrap_or_else(|| ResourceId::from("leaf1"))
    }

    fn threshold_cluster(&self) -> ClusterId {
        self.threshold_cluster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_grouping() {
        let topo = SimTopology::build(SimParams::default());
        assert_eq!(topo.attacker_clusters().len(), 5);
        assert_eq!(
            topo.attacker_clusters()
                .values()
                .map(Vec::len)
                .sum::<usize>(),
            50
        );
        assert_eq!(topo.edge_switches().len(), 5);
        assert_eq!(topo.threshold_switch(), ResourceId::from("leaf4"));
        // 50 attackers + server + origin + 5 switches.
        assert_eq!(topo.executors().len(), 57);
    }

    #[test]
    fn addressing_is_disjoint() {
        let topo = SimTopology::build(SimParams::default());
        let mut addrs: Vec<IpAddr> = topo
            .attacker_clusters()
            .values()
            .flatten()
            .map(|h| h.addr)
            .collect();
        addrs.push(topo.server().addr);
        addrs.push(topo.probe_origin().addr);

        let unique: std::collections::HashSet<_> = addrs.iter().collect();
        assert_eq!(unique.len(), addrs.len());
    }
}
