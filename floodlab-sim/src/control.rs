//! OpenFlow-style switch control backend.
//!
//! Renders the semantic rule/meter operations into `ovs-ofctl` commands
//! and sends them through the gateway, so concurrent callers stay
//! serialized per switch. Deny and metered-forward operations cover both
//! attack services (TCP and UDP) with a rule pair, matching how the flood
//! itself is generated.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use floodlab_core::control::SwitchControl;
use floodlab_core::error::GatewayError;
use floodlab_core::gateway::CommandGateway;
use floodlab_core::resource::ResourceId;

const PROTOS: [&str; 2] = ["tcp", "udp"];

pub struct OpenFlowControl {
    gateway: Arc<CommandGateway>,
}

impl OpenFlowControl {
    pub fn new(gateway: Arc<CommandGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl SwitchControl for OpenFlowControl {
    async fn add_deny(
        &self,
        switch: &ResourceId,
        src: IpAddr,
        dst: IpAddr,
        priority: u16,
    ) -> Result<(), GatewayError> {
        for proto in PROTOS {
            let command = format!(
                "ovs-ofctl -O OpenFlow13 add-flow {switch} \
                 'priority={priority},{proto},nw_src={src},nw_dst={dst},actions=drop'"
            );
            self.gateway.execute(switch, &command).await?;
        }
        Ok(())
    }

    async fn remove_deny(
        &self,
        switch: &ResourceId,
        src: IpAddr,
        dst: IpAddr,
        priority: u16,
    ) -> Result<(), GatewayError> {
        for proto in PROTOS {
            let command = format!(
                "ovs-ofctl -O OpenFlow13 del-flows {switch} \
                 'priority={priority},{proto},nw_src={src},nw_dst={dst}'"
            );
            self.gateway.execute(switch, &command).await?;
        }
        Ok(())
    }

    async fn add_meter(
        &self,
        switch: &ResourceId,
        meter_id: u32,
        rate_kbps: u32,
    ) -> Result<(), GatewayError> {
        let command = format!(
            "ovs-ofctl -O OpenFlow13 add-meter {switch} \
             'meter={meter_id},kbps,band=type=drop,rate={rate_kbps}'"
        );
        self.gateway.execute(switch, &command).await?;
        Ok(())
    }

    async fn remove_meter(&self, switch: &ResourceId, meter_id: u32) -> Result<(), GatewayError> {
        let command = format!("ovs-ofctl -O OpenFlow13 del-meters {switch} 'meter={meter_id}'");
        self.gateway.execute(switch, &command).await?;
        Ok(())
    }

    async fn add_metered_forward(
        &self,
        switch: &ResourceId,
        src: IpAddr,
        dst: IpAddr,
        meter_id: u32,
        priority: u16,
    ) -> Result<(), GatewayError> {
        for proto in PROTOS {
            let command = format!(
                "ovs-ofctl -O OpenFlow13 add-flow {switch} \
                 'priority={priority},{proto},nw_src={src},nw_dst={dst},actions=meter:{meter_id},NORMAL'"
            );
            self.gateway.execute(switch, &command).await?;
        }
        Ok(())
    }

    async fn remove_metered_forward(
        &self,
        switch: &ResourceId,
        src: IpAddr,
        dst: IpAddr,
        priority: u16,
    ) -> Result<(), GatewayError> {
        for proto in PROTOS {
            let command = format!(
                "ovs-ofctl -O OpenFlow13 del-flows {switch} \
                 'priority={priority},{proto},nw_src={src},nw_dst={dst}'"
            );
            self.gateway.execute(switch, &command).await?;
        }
        Ok(())
    }
}
