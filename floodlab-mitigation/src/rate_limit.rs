//! Rate-limit: per-cluster drop-band meters on the cluster edge switches.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use floodlab_core::control::SwitchControl;
use floodlab_core::resource::ResourceId;
use floodlab_core::topology::ClusterId;

pub const RATE_LIMIT_PRIORITY: u16 = 200;

/// Meter identifiers are derived from the cluster id so removal can
/// always reconstruct them.
fn meter_id(cluster: ClusterId) -> u32 {
    1000 + cluster
}

/// Per cluster: one drop-band meter on the edge switch plus a
/// pass-through-with-meter rule for every attacker address. No expiry.
pub struct RateLimit {
    control: Arc<dyn SwitchControl>,
    clusters: BTreeMap<ClusterId, (ResourceId, Vec<IpAddr>)>,
    server: IpAddr,
    rate_kbps: u32,
}

impl RateLimit {
    pub fn new(
        control: Arc<dyn SwitchControl>,
        clusters: BTreeMap<ClusterId, (ResourceId, Vec<IpAddr>)>,
        server: IpAddr,
        rate_kbps: u32,
    ) -> Self {
        Self {
            control,
            clusters,
            server,
            rate_kbps,
        }
    }

    /// Installs meters and metered-forward rules; returns how many
    /// attacker addresses are now limited. A cluster whose meter cannot
    /// be installed is skipped entirely.
    pub async fn apply(&self) -> usize {
        let mut limited = 0usize;

        for (&cluster, (switch, addrs)) in &self.clusters {
            let meter = meter_id(cluster);
            if let Err(err) = self.control.add_meter(switch, meter, self.rate_kbps).await {
                warn!(%cluster, %switch, %err, "rate-limit: meter install failed, skipping cluster");
                continue;
            }

            for &addr in addrs {
                match self
                    .control
                    .add_metered_forward(switch, addr, self.server, meter, RATE_LIMIT_PRIORITY)
                    .await
                {
                    Ok(()) => limited += 1,
                    Err(err) => {
                        warn!(%cluster, %addr, %err, "rate-limit: forward rule install failed");
                    }
                }
            }
        }

        info!(
            limited,
            rate_kbps = self.rate_kbps,
            "rate-limit: metered forwarding installed"
        );
        limited
    }

    /// Deletes the metered-forward rules, then the meters. Idempotent.
    pub async fn remove(&self) {
        for (&cluster, (switch, addrs)) in &self.clusters {
            for &addr in addrs {
                if let Err(err) = self
                    .control
                    .remove_metered_forward(switch, addr, self.server, RATE_LIMIT_PRIORITY)
                    .await
                {
                    warn!(%cluster, %addr, %err, "rate-limit: forward rule removal failed");
                }
            }
            if let Err(err) = self.control.remove_meter(switch, meter_id(cluster)).await {
                warn!(%cluster, %switch, %err, "rate-limit: meter removal failed");
            }
        }
        debug!("rate-limit: rules and meters removed");
    }
}
