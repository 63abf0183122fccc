//! Topology provider seam and the whitelist-filtered attacker partition.
//!
//! Topology construction itself is an external concern; the core only
//! consumes the grouping it exposes. The attacker partition is computed
//! once per run: every cluster host whose address falls inside the
//! whitelist is excluded, so legitimate hosts can never be targeted by a
//! mitigation.

use std::collections::BTreeMap;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::resource::ResourceId;

pub type ClusterId = u32;

/// An addressable host resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRef {
    pub id: ResourceId,
    pub addr: IpAddr,
}

/// Read-only view of the emulated network, supplied by the excluded
/// topology backend.
pub trait TopologyProvider: Send + Sync {
    /// Attacker host resources grouped by cluster id.
    fn attacker_clusters(&self) -> BTreeMap<ClusterId, Vec<HostRef>>;

    /// The service under attack.
    fn server(&self) -> HostRef;

    /// The designated probing-origin host.
    fn probe_origin(&self) -> HostRef;

    /// Edge switch for each attacker cluster.
    fn edge_switches(&self) -> BTreeMap<ClusterId, ResourceId>;

    /// The single switch designated for threshold-block rules.
    fn threshold_switch(&self) -> ResourceId;

    /// The cluster whose addresses threshold-block denies.
    fn threshold_cluster(&self) -> ClusterId;
}

/// Attacker resources grouped by cluster, with whitelisted addresses
/// excluded. Built once per run and immutable thereafter.
#[derive(Debug, Clone)]
pub struct AttackerPartition {
    clusters: BTreeMap<ClusterId, Vec<HostRef>>,
}

impl AttackerPartition {
    pub fn build(
        clusters: &BTreeMap<ClusterId, Vec<HostRef>>,
        whitelist: &[IpNetwork],
    ) -> Self {
        let mut filtered = BTreeMap::new();
        let mut total = 0usize;

        for (&cluster, hosts) in clusters {
            let mut kept = Vec::with_capacity(hosts.len());
            for host in hosts {
                if whitelist.iter().any(|net| net.contains(host.addr)) {
                    warn!(
                        %cluster,
                        addr = %host.addr,
                        "whitelisted address found in attacker cluster, excluding"
                    );
                    continue;
                }
                kept.push(host.clone());
            }
            total += kept.len();
            filtered.insert(cluster, kept);
        }

        info!(
            clusters = filtered.len(),
            attackers = total,
            whitelist_entries = whitelist.len(),
            "attacker partition built"
        );
        Self { clusters: filtered }
    }

    pub fn clusters(&self) -> &BTreeMap<ClusterId, Vec<HostRef>> {
        &self.clusters
    }

    pub fn cluster_addrs(&self, id: ClusterId) -> Vec<IpAddr> {
        self.clusters
            .get(&id)
            .map(|hosts| hosts.iter().map(|h| h.addr).collect())
            .unwrap_or_default()
    }

    /// Every attacker host, cluster order.
    pub fn all_hosts(&self) -> impl Iterator<Item = &HostRef> {
        self.clusters.values().flatten()
    }

    /// One representative host per non-empty cluster, used for liveness
    /// sampling.
    pub fn sample_hosts(&self) -> Vec<HostRef> {
        self.clusters
            .values()
            .filter_map(|hosts| hosts.first().cloned())
            .collect()
    }

    pub fn total_attackers(&self) -> usize {
        self.clusters.values().map(Vec::len).sum()
    }
}
