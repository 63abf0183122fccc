//! Threshold-block: deny rules on a single designated switch.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use floodlab_core::control::SwitchControl;
use floodlab_core::resource::ResourceId;

/// Rule priority for threshold-block denies; above normal forwarding and
/// above the other strategies so removal never touches foreign rules.
pub const THRESHOLD_BLOCK_PRIORITY: u16 = 310;

/// Installs deny rules for a designated subset of attacker addresses on
/// one designated switch. No expiry; rules stay until removed.
pub struct ThresholdBlock {
    control: Arc<dyn SwitchControl>,
    switch: ResourceId,
    addrs: Vec<IpAddr>,
    server: IpAddr,
}

impl ThresholdBlock {
    pub fn new(
        control: Arc<dyn SwitchControl>,
        switch: ResourceId,
        addrs: Vec<IpAddr>,
        server: IpAddr,
    ) -> Self {
        Self {
            control,
            switch,
            addrs,
            server,
        }
    }

    /// Installs the deny rules; returns how many addresses were blocked.
    /// Per-address failures are logged and skipped.
    pub async fn apply(&self) -> usize {
        let mut blocked = 0usize;
        for &addr in &self.addrs {
            match self
                .control
                .add_deny(&self.switch, addr, self.server, THRESHOLD_BLOCK_PRIORITY)
                .await
            {
                Ok(()) => blocked += 1,
                Err(err) => {
                    warn!(switch = %self.switch, %addr, %err, "threshold-block: deny install failed");
                }
            }
        }
        info!(blocked, switch = %self.switch, "threshold-block: deny rules installed");
        blocked
    }

    /// Deletes this strategy's deny rules. Safe to call at any time, any
    /// number of times; deleting an absent rule is a no-op.
    pub async fn remove(&self) {
        for &addr in &self.addrs {
            if let Err(err) = self
                .control
                .remove_deny(&self.switch, addr, self.server, THRESHOLD_BLOCK_PRIORITY)
                .await
            {
                warn!(switch = %self.switch, %addr, %err, "threshold-block: deny removal failed");
            }
        }
        debug!(switch = %self.switch, "threshold-block: deny rules removed");
    }
}
