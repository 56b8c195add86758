//! 六节点 dumbbell 拓扑
//!
//! ```text
//!  n0 ---+          +--- n2
//!        |          |
//!        n4 ====== n5
//!        |          |
//!  n1 ---+          +--- n3
//! ```
//!
//! n0..n3 为主机，n4、n5 为路由器（交换机）。

use super::{P2pOpts, Topology};
use crate::net::{DataRate, NetWorld};
use crate::sim::SimTime;

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone)]
pub struct DumbbellOpts {
    pub access: P2pOpts,
    pub bottleneck: P2pOpts,
}

impl Default for DumbbellOpts {
    fn default() -> Self {
        Self {
            access: P2pOpts::new(DataRate::from_mbps(10), SimTime::from_millis(1)),
            bottleneck: P2pOpts::new(DataRate::from_mbps(1), SimTime::from_millis(3)),
        }
    }
}

/// 构建 dumbbell 拓扑，`nodes[i]` 对应 ni
pub fn build_dumbbell(world: &mut NetWorld, opts: &DumbbellOpts) -> Topology {
    let mut nodes: Vec<_> = (0..4).map(|i| world.net.add_host(format!("n{i}"))).collect();
    let r4 = world.net.add_switch("n4");
    let r5 = world.net.add_switch("n5");
    nodes.extend([r4, r5]);

    let (a, b) = (opts.access, opts.bottleneck);
    world.net.connect_duplex(nodes[0], r4, a.delay, a.rate);
    world.net.connect_duplex(nodes[1], r4, a.delay, a.rate);
    world.net.connect_duplex(nodes[2], r5, a.delay, a.rate);
    world.net.connect_duplex(nodes[3], r5, a.delay, a.rate);
    world.net.connect_duplex(r4, r5, b.delay, b.rate);

    Topology {
        nodes,
        bottleneck: (r4, r5),
    }
}
