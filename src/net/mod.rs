//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件，如节点、链路、数据包、网络拓扑，
//! 以及供应用使用的传输层连接。

// 子模块声明
mod deliver_packet;
mod id;
mod link;
mod link_ready;
mod net_world;
mod network;
mod node;
mod packet;
mod rate;
mod socket;
mod stats;

// 重新导出公共接口
pub use deliver_packet::DeliverPacket;
pub use id::{Endpoint, LinkId, NodeId};
pub use link::Link;
pub use link_ready::LinkReady;
pub use net_world::NetWorld;
pub use network::Network;
pub use node::{Host, Node, Switch};
pub use packet::Packet;
pub use rate::{DataRate, RateParseError};
pub use socket::{Connection, SimSocket, TransportError};
pub use stats::{FlowStats, Stats};
