//! 拓扑构建
//!
//! 实验用的点到点拓扑。所有链路均为双向（两条单向链路）。

pub mod chain;
pub mod dumbbell;

use crate::net::{DataRate, NodeId};
use crate::sim::SimTime;

/// 点到点链路参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct P2pOpts {
    pub rate: DataRate,
    pub delay: SimTime,
}

impl P2pOpts {
    pub const fn new(rate: DataRate, delay: SimTime) -> Self {
        Self { rate, delay }
    }
}

/// 构建结果：按编号排列的全部节点，以及瓶颈链路的两端
#[derive(Debug, Clone)]
pub struct Topology {
    pub nodes: Vec<NodeId>,
    pub bottleneck: (NodeId, NodeId),
}
