//! 网络拓扑管理
//!
//! 定义网络拓扑结构，包含节点、链路、接收端、数据包转发和统计信息。

use std::collections::{BTreeSet, HashMap, VecDeque};

use super::deliver_packet::DeliverPacket;
use super::id::{Endpoint, LinkId, NodeId};
use super::link::Link;
use super::link_ready::LinkReady;
use super::node::{Host, Node, Switch};
use super::packet::Packet;
use super::rate::DataRate;
use super::stats::Stats;
use crate::queue::DropTailQueue;
use crate::sim::{SimTime, Scheduler};
use tracing::{debug, trace, warn};

/// 首个临时端口（与常见 OS 的 ephemeral 区间一致）
const EPHEMERAL_PORT_BASE: u16 = 49152;

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    names: Vec<String>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    listeners: BTreeSet<Endpoint>,
    bound: BTreeSet<Endpoint>,
    next_pkt_id: u64,
    next_flow_id: u64,
    pub stats: Stats,
}

impl Network {
    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = name.into();
        self.nodes.push(Some(Box::new(Host::new(id, name.clone()))));
        self.names.push(name);
        id
    }

    /// 添加交换机节点
    pub fn add_switch(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let name = name.into();
        self.nodes.push(Some(Box::new(Switch::new(id, name.clone()))));
        self.names.push(name);
        id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    /// 连接两个节点（创建单向链路）
    pub fn connect(&mut self, from: NodeId, to: NodeId, latency: SimTime, rate: DataRate) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(Link::new(from, to, latency, rate));
        self.edges.insert((from, to), id);
        id
    }

    /// 双向连接（点到点信道）
    pub fn connect_duplex(&mut self, a: NodeId, b: NodeId, latency: SimTime, rate: DataRate) {
        self.connect(a, b, latency, rate);
        self.connect(b, a, latency, rate);
    }

    pub fn link(&self, from: NodeId, to: NodeId) -> Option<&Link> {
        self.edges.get(&(from, to)).map(|id| &self.links[id.0])
    }

    /// 设置 (from -> to) 链路出口队列容量（字节）
    pub fn set_link_queue_capacity_bytes(&mut self, from: NodeId, to: NodeId, cap_bytes: u64) -> bool {
        let Some(id) = self.edges.get(&(from, to)) else {
            return false;
        };
        self.links[id.0].queue = Box::new(DropTailQueue::new(cap_bytes));
        true
    }

    /// (from -> to) 链路队列中积压的字节数
    pub fn link_backlog_bytes(&self, from: NodeId, to: NodeId) -> u64 {
        self.link(from, to).map(|l| l.queue.bytes()).unwrap_or(0)
    }

    /// 按跳数最短的路径（BFS，邻居按链路创建顺序遍历，结果确定）。
    pub fn route(&self, from: NodeId, to: NodeId) -> Option<Vec<NodeId>> {
        let n = self.nodes.len();
        if from.0 >= n || to.0 >= n {
            return None;
        }
        if from == to {
            return Some(vec![from]);
        }

        let mut adj: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for l in &self.links {
            adj[l.from.0].push(l.to);
        }

        let mut parent: Vec<Option<NodeId>> = vec![None; n];
        let mut seen = vec![false; n];
        let mut q = VecDeque::new();
        seen[from.0] = true;
        q.push_back(from);
        while let Some(v) = q.pop_front() {
            if v == to {
                break;
            }
            for &nh in &adj[v.0] {
                if !seen[nh.0] {
                    seen[nh.0] = true;
                    parent[nh.0] = Some(v);
                    q.push_back(nh);
                }
            }
        }
        if !seen[to.0] {
            return None;
        }

        let mut path = vec![to];
        let mut cur = to;
        while let Some(p) = parent[cur.0] {
            path.push(p);
            cur = p;
        }
        path.reverse();
        Some(path)
    }

    /// 在端点上安装接收端（packet sink）
    pub fn listen(&mut self, ep: Endpoint) {
        self.listeners.insert(ep);
    }

    pub fn is_listening(&self, ep: Endpoint) -> bool {
        self.listeners.contains(&ep)
    }

    /// 为节点分配一个未被占用的临时端口
    pub(crate) fn alloc_port(&mut self, node: NodeId) -> Option<Endpoint> {
        let ep = (EPHEMERAL_PORT_BASE..=u16::MAX)
            .map(|port| Endpoint::new(node, port))
            .find(|ep| !self.bound.contains(ep) && !self.listeners.contains(ep))?;
        self.bound.insert(ep);
        Some(ep)
    }

    pub(crate) fn release_port(&mut self, ep: Endpoint) {
        self.bound.remove(&ep);
    }

    /// 分配流 id（从 1 开始，与 flow monitor 的编号习惯一致）
    pub(crate) fn alloc_flow_id(&mut self) -> u64 {
        self.next_flow_id += 1;
        self.next_flow_id
    }

    /// 创建数据包
    pub fn make_packet(&mut self, flow_id: u64, size_bytes: u32, route: Vec<NodeId>, dst_port: u16) -> Packet {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        Packet {
            id,
            flow_id,
            size_bytes,
            route,
            hop: 0,
            dst_port,
        }
    }

    /// 将数据包交付给节点处理
    #[tracing::instrument(skip(self, pkt, sched), fields(pkt_id = pkt.id, to = ?to))]
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sched: &mut dyn Scheduler) {
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let Some(mut node) = self.nodes.get_mut(to.0).and_then(Option::take) else {
            warn!("目的节点不存在，丢弃");
            self.on_dropped(pkt);
            return;
        };
        trace!(node_name = %node.name(), "取出节点");

        node.on_packet(pkt, sched, self);

        self.nodes[to.0] = Some(node);
    }

    /// 从指定节点转发数据包：链路空闲则立即发送，否则进入出口队列。
    #[tracing::instrument(skip(self, pkt, sched), fields(pkt_id = pkt.id, from = ?from, hop = pkt.hop))]
    pub fn forward_from(&mut self, from: NodeId, pkt: Packet, sched: &mut dyn Scheduler) {
        let Some(to) = pkt.next() else {
            warn!("没有下一跳，丢弃");
            self.on_dropped(pkt);
            return;
        };
        let Some(&link_id) = self.edges.get(&(from, to)) else {
            warn!(?to, "没有对应链路，丢弃");
            self.on_dropped(pkt);
            return;
        };

        let now = sched.now();
        let link = &mut self.links[link_id.0];
        if link.is_busy(now) {
            trace!(queued_bytes = link.queue.bytes(), "链路忙，入队");
            if let Err(pkt) = link.queue.enqueue(pkt) {
                debug!(cap_bytes = link.queue.capacity_bytes(), "队列已满，尾丢弃");
                self.on_dropped(pkt);
            }
            return;
        }
        self.transmit(link_id, pkt, sched);
    }

    /// 在链路上开始序列化一个 packet，调度其到达事件与链路就绪事件。
    fn transmit(&mut self, link_id: LinkId, pkt: Packet, sched: &mut dyn Scheduler) {
        let link = &mut self.links[link_id.0];
        let now = sched.now();
        let tx_time = link.tx_time(pkt.size_bytes);
        link.busy_until = now.saturating_add(tx_time);
        let to = link.to;
        let arrive_after = tx_time.saturating_add(link.latency);

        trace!(
            ?link_id,
            ?tx_time,
            depart = ?link.busy_until,
            ?arrive_after,
            "计算传输时间"
        );

        sched.schedule_after(arrive_after, Box::new(DeliverPacket { to, pkt: pkt.advance() }));
        sched.schedule_after(tx_time, Box::new(LinkReady { link_id }));
    }

    /// 链路发送完成：若队列中有积压，发送下一个。
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sched: &mut dyn Scheduler) {
        let Some(link) = self.links.get_mut(link_id.0) else {
            return;
        };
        if link.busy_until > sched.now() {
            return;
        }
        if let Some(pkt) = link.queue.dequeue() {
            self.transmit(link_id, pkt, sched);
        }
    }

    /// 数据包到达最后一跳
    #[tracing::instrument(skip(self, pkt), fields(pkt_id = pkt.id, flow_id = pkt.flow_id))]
    pub(crate) fn on_delivered(&mut self, at: NodeId, pkt: Packet, now: SimTime) {
        let ep = Endpoint::new(at, pkt.dst_port);
        if !self.listeners.contains(&ep) {
            debug!(%ep, "没有接收端监听该端口，丢弃");
            self.on_dropped(pkt);
            return;
        }

        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += pkt.size_bytes as u64;
        self.stats.flow_mut(pkt.flow_id).on_rx(now, pkt.size_bytes);

        trace!(
            size_bytes = pkt.size_bytes,
            delivered_pkts = self.stats.delivered_pkts,
            "✅ 数据包送达接收端"
        );
    }

    pub(crate) fn on_dropped(&mut self, pkt: Packet) {
        self.stats.dropped_pkts += 1;
        self.stats.dropped_bytes += pkt.size_bytes as u64;
        self.stats.flow_mut(pkt.flow_id).on_drop(pkt.size_bytes);
    }
}
