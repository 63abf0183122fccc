// floodlab-sim/src/lib.rs

/*!
# Floodlab Simulator

An in-memory stand-in for the emulated network: hosts that can run flood
generators, switches with flow tables and drop-band meters, and a
load-dependent latency model, all driven through the same textual command
interface a real deployment would use.

## Key Components:
- **World:** shared host/switch state and the congestion model.
- **Executors:** per-resource command interpreters (ping, generators,
  flow and meter manipulation).
- **OpenFlow Control:** the switch-control backend that renders semantic
  rule operations into `ovs-ofctl`-style commands through the gateway.
- **Topology:** the clustered attacker layout (N clusters × M hosts, one
  edge switch per cluster, a server and a probing origin).
*/

pub mod control;
pub mod executor;
pub mod latency;
pub mod topology;
pub mod world;

pub use control::OpenFlowControl;
pub use executor::{SimHostExecutor, SimSwitchExecutor};
pub use topology::{SimParams, SimTopology};
pub use world::{FlowAction, FlowRule, Proto, SimWorld};
