//! Switch control-plane seam.
//!
//! Mitigation strategies speak in semantic operations; the concrete
//! flow-rule and meter syntax of any particular control plane lives in
//! the backend implementation, which routes each operation through the
//! command gateway so switch access stays serialized.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::resource::ResourceId;

/// Semantic rule and meter operations against one switch.
///
/// Removal of a rule or meter that is not installed must succeed as a
/// no-op; mitigation teardown relies on that.
#[async_trait]
pub trait SwitchControl: Send + Sync {
    /// Denies all attack-service traffic from `src` to `dst`.
    async fn add_deny(
        &self,
        switch: &ResourceId,
        src: IpAddr,
        dst: IpAddr,
        priority: u16,
    ) -> Result<(), GatewayError>;

    async fn remove_deny(
        &self,
        switch: &ResourceId,
        src: IpAddr,
        dst: IpAddr,
        priority: u16,
    ) -> Result<(), GatewayError>;

    /// Installs a drop-band traffic meter.
    async fn add_meter(
        &self,
        switch: &ResourceId,
        meter_id: u32,
        rate_kbps: u32,
    ) -> Result<(), GatewayError>;

    async fn remove_meter(&self, switch: &ResourceId, meter_id: u32) -> Result<(), GatewayError>;

    /// Forwards `src`→`dst` attack-service traffic through a meter.
    async fn add_metered_forward(
        &self,
        switch: &ResourceId,
        src: IpAddr,
        dst: IpAddr,
        meter_id: u32,
        priority: u16,
    ) -> Result<(), GatewayError>;

    async fn remove_metered_forward(
        &self,
        switch: &ResourceId,
        src: IpAddr,
        dst: IpAddr,
        priority: u16,
    ) -> Result<(), GatewayError>;
}
