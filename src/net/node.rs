//! 节点类型
//!
//! 定义网络节点，包括节点 trait 和具体实现（主机、交换机）。

use super::id::NodeId;
use super::network::Network;
use super::packet::Packet;
use crate::sim::Scheduler;
use tracing::{debug, trace};

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    /// 处理到达的数据包
    fn on_packet(&mut self, pkt: Packet, sched: &mut dyn Scheduler, net: &mut Network);
}

/// 主机节点：可以作为流的终点，也可以转发（链式拓扑中的中间主机）
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
}

impl Host {
    /// 创建新主机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, sched, net), fields(node_name = %self.name(), pkt_id = pkt.id, flow_id = pkt.flow_id))]
    fn on_packet(&mut self, pkt: Packet, sched: &mut dyn Scheduler, net: &mut Network) {
        trace!(hop = pkt.hop, dst = ?pkt.dst(), "🖥️  Host 处理数据包");

        if pkt.has_next() {
            debug!("未到达目的地，继续转发");
            net.forward_from(self.id, pkt, sched);
        } else {
            net.on_delivered(self.id, pkt, sched.now());
        }
    }
}

/// 交换机节点：只转发，不终结流
#[derive(Debug)]
pub struct Switch {
    id: NodeId,
    name: String,
}

impl Switch {
    /// 创建新交换机
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Switch {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, sched, net), fields(node_name = %self.name(), pkt_id = pkt.id, flow_id = pkt.flow_id))]
    fn on_packet(&mut self, pkt: Packet, sched: &mut dyn Scheduler, net: &mut Network) {
        trace!(hop = pkt.hop, dst = ?pkt.dst(), "🔀 Switch 处理数据包");

        if pkt.has_next() {
            net.forward_from(self.id, pkt, sched);
        } else {
            debug!("交换机不是流的终点，丢弃");
            net.on_dropped(pkt);
        }
    }
}
