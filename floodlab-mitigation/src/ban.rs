//! Temporary ban: cluster-wide deny rules that self-expire.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use floodlab_core::control::SwitchControl;
use floodlab_core::resource::ResourceId;
use floodlab_core::topology::ClusterId;

pub const TEMP_BAN_PRIORITY: u16 = 300;

/// Installs deny rules for every attacker address on its cluster's edge
/// switch. Expiry scheduling is owned by the controller; this strategy
/// only knows how to install and tear down its rules.
pub struct TempBan {
    control: Arc<dyn SwitchControl>,
    clusters: BTreeMap<ClusterId, (ResourceId, Vec<IpAddr>)>,
    server: IpAddr,
}

impl TempBan {
    pub fn new(
        control: Arc<dyn SwitchControl>,
        clusters: BTreeMap<ClusterId, (ResourceId, Vec<IpAddr>)>,
        server: IpAddr,
    ) -> Self {
        Self {
            control,
            clusters,
            server,
        }
    }

    /// Installs the deny rules; returns how many addresses were banned.
    pub async fn apply(&self) -> usize {
        let mut banned = 0usize;
        for (&cluster, (switch, addrs)) in &self.clusters {
            for &addr in addrs {
                match self
                    .control
                    .add_deny(switch, addr, self.server, TEMP_BAN_PRIORITY)
                    .await
                {
                    Ok(()) => banned += 1,
                    Err(err) => {
                        warn!(%cluster, %addr, %err, "temp-ban: deny install failed");
                    }
                }
            }
        }
        info!(banned, "temp-ban: deny rules installed");
        banned
    }

    /// Deletes the ban rules. Called both by the expiry timer and by
    /// phase teardown; the two may race in either order, so deleting an
    /// absent rule must be (and is) a no-op.
    pub async fn remove(&self) {
        for (&cluster, (switch, addrs)) in &self.clusters {
            for &addr in addrs {
                if let Err(err) = self
                    .control
                    .remove_deny(switch, addr, self.server, TEMP_BAN_PRIORITY)
                    .await
                {
                    warn!(%cluster, %addr, %err, "temp-ban: deny removal failed");
                }
            }
        }
        debug!("temp-ban: deny rules removed");
    }
}
