//! 传输层连接
//!
//! `Connection` 是应用与传输层之间的接缝：应用按
//! `bind → connect → send* → close` 的顺序调用。`SimSocket` 是基于
//! 仿真网络的实现，把每次发送变成一个沿最短路径转发的 packet。

use thiserror::Error;
use tracing::{debug, trace};

use super::id::{Endpoint, NodeId};
use super::network::Network;
use crate::sim::Scheduler;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("socket is not bound")]
    NotBound,
    #[error("socket is not connected")]
    NotConnected,
    #[error("socket is already connected to {0}")]
    AlreadyConnected(Endpoint),
    #[error("socket is closed")]
    Closed,
    #[error("no free port on {0}")]
    AddressInUse(NodeId),
    #[error("connection refused by {0}")]
    ConnectionRefused(Endpoint),
    #[error("no route to {0}")]
    NoRoute(Endpoint),
    #[error("send buffer full: {queued} bytes queued, {len} more would exceed {capacity}")]
    BufferFull { queued: u64, len: u32, capacity: u64 },
}

/// 面向连接的传输会话。
///
/// `Env` 是实现需要访问的外部环境（例如网络拓扑）。
pub trait Connection {
    type Env: ?Sized;

    fn bind(&mut self, env: &mut Self::Env) -> Result<Endpoint, TransportError>;

    fn connect(&mut self, peer: Endpoint, env: &mut Self::Env) -> Result<(), TransportError>;

    /// 发送 `len` 字节载荷，成功时返回已接受的字节数。
    fn send(
        &mut self,
        len: u32,
        sched: &mut dyn Scheduler,
        env: &mut Self::Env,
    ) -> Result<u32, TransportError>;

    /// 关闭连接；重复关闭无副作用。
    fn close(&mut self, env: &mut Self::Env);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketState {
    Fresh,
    Bound(Endpoint),
    Connected { local: Endpoint, peer: Endpoint },
    Closed,
}

/// 仿真网络上的 socket
#[derive(Debug, Clone)]
pub struct SimSocket {
    node: NodeId,
    flow_id: Option<u64>,
    state: SocketState,
    route: Vec<NodeId>,
    /// 发送缓冲上限（字节），None 表示不限
    snd_buf_bytes: Option<u64>,
}

impl SimSocket {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            flow_id: None,
            state: SocketState::Fresh,
            route: Vec::new(),
            snd_buf_bytes: None,
        }
    }

    pub fn with_send_buffer(mut self, bytes: Option<u64>) -> Self {
        self.snd_buf_bytes = bytes;
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// 连接后分配的流 id
    pub fn flow_id(&self) -> Option<u64> {
        self.flow_id
    }

    pub fn local(&self) -> Option<Endpoint> {
        match self.state {
            SocketState::Bound(local) | SocketState::Connected { local, .. } => Some(local),
            _ => None,
        }
    }

    pub fn peer(&self) -> Option<Endpoint> {
        match self.state {
            SocketState::Connected { peer, .. } => Some(peer),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == SocketState::Closed
    }

    /// 发送缓冲中已占用的字节：首跳链路出口队列的积压。
    ///
    /// 首跳链路空闲时 packet 直接上线路，不占缓冲，返回 None。
    fn buffered_bytes(&self, net: &Network, sched: &dyn Scheduler) -> Option<u64> {
        let next = *self.route.get(1)?;
        let link = net.link(self.node, next)?;
        link.is_busy(sched.now()).then(|| link.queue.bytes())
    }
}

impl Connection for SimSocket {
    type Env = Network;

    fn bind(&mut self, net: &mut Network) -> Result<Endpoint, TransportError> {
        match self.state {
            SocketState::Fresh => {}
            SocketState::Bound(local) => return Ok(local),
            SocketState::Connected { peer, .. } => return Err(TransportError::AlreadyConnected(peer)),
            SocketState::Closed => return Err(TransportError::Closed),
        }
        let local = net
            .alloc_port(self.node)
            .ok_or(TransportError::AddressInUse(self.node))?;
        self.state = SocketState::Bound(local);
        debug!(%local, "socket bound");
        Ok(local)
    }

    fn connect(&mut self, peer: Endpoint, net: &mut Network) -> Result<(), TransportError> {
        let local = match self.state {
            SocketState::Bound(local) => local,
            SocketState::Fresh => return Err(TransportError::NotBound),
            SocketState::Connected { peer, .. } => return Err(TransportError::AlreadyConnected(peer)),
            SocketState::Closed => return Err(TransportError::Closed),
        };
        if !net.is_listening(peer) {
            return Err(TransportError::ConnectionRefused(peer));
        }
        let route = net
            .route(self.node, peer.node)
            .ok_or(TransportError::NoRoute(peer))?;

        let flow_id = net.alloc_flow_id();
        self.flow_id = Some(flow_id);
        self.route = route;
        self.state = SocketState::Connected { local, peer };
        debug!(%local, %peer, flow_id, hops = self.route.len().saturating_sub(1), "socket connected");
        Ok(())
    }

    fn send(
        &mut self,
        len: u32,
        sched: &mut dyn Scheduler,
        net: &mut Network,
    ) -> Result<u32, TransportError> {
        let (peer, flow_id) = match (self.state, self.flow_id) {
            (SocketState::Connected { peer, .. }, Some(flow_id)) => (peer, flow_id),
            (SocketState::Closed, _) => return Err(TransportError::Closed),
            _ => return Err(TransportError::NotConnected),
        };

        if let (Some(capacity), Some(queued)) = (self.snd_buf_bytes, self.buffered_bytes(net, sched)) {
            if queued.saturating_add(len as u64) > capacity {
                return Err(TransportError::BufferFull { queued, len, capacity });
            }
        }

        let pkt = net.make_packet(flow_id, len, self.route.clone(), peer.port);
        trace!(pkt_id = pkt.id, flow_id, len, "socket send");
        net.stats.flow_mut(flow_id).on_tx(sched.now(), len);
        if pkt.has_next() {
            net.forward_from(self.node, pkt, sched);
        } else {
            // 同一节点上的回环
            net.on_delivered(self.node, pkt, sched.now());
        }
        Ok(len)
    }

    fn close(&mut self, net: &mut Network) {
        match self.state {
            SocketState::Bound(local) | SocketState::Connected { local, .. } => {
                net.release_port(local);
                debug!(%local, "socket closed");
            }
            SocketState::Fresh | SocketState::Closed => {}
        }
        self.state = SocketState::Closed;
    }
}
