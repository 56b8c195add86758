//! 链式拓扑（缓冲区大小实验）
//!
//! n0 ---- n1 ==== n2 ---- n3
//!
//! `----` 为接入链路，`====` 为瓶颈链路。

use super::{P2pOpts, Topology};
use crate::net::{DataRate, NetWorld};
use crate::sim::SimTime;

#[derive(Debug, Clone)]
pub struct ChainOpts {
    pub access: P2pOpts,
    pub bottleneck: P2pOpts,
}

impl Default for ChainOpts {
    fn default() -> Self {
        Self {
            access: P2pOpts::new(DataRate::from_mbps(10), SimTime::from_millis(1)),
            bottleneck: P2pOpts::new(DataRate::from_mbps(1), SimTime::from_millis(3)),
        }
    }
}

pub fn build_chain(world: &mut NetWorld, opts: &ChainOpts) -> Topology {
    let nodes: Vec<_> = (0..4).map(|i| world.net.add_host(format!("n{i}"))).collect();
    let (a, b) = (opts.access, opts.bottleneck);

    world.net.connect_duplex(nodes[0], nodes[1], a.delay, a.rate);
    world.net.connect_duplex(nodes[1], nodes[2], b.delay, b.rate);
    world.net.connect_duplex(nodes[2], nodes[3], a.delay, a.rate);

    Topology {
        bottleneck: (nodes[1], nodes[2]),
        nodes,
    }
}
