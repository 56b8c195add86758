//! 数据包类型
//!
//! 定义网络数据包及其相关操作。

use super::id::NodeId;

/// 网络数据包（只建模大小与路径，不携带真实载荷）
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub flow_id: u64,
    pub size_bytes: u32,
    pub route: Vec<NodeId>,
    pub hop: usize, // 当前所在节点在 route 中的索引
    /// 目的端口（用于在目的主机上找到接收端）
    pub dst_port: u16,
}

impl Packet {
    /// 获取源节点
    pub fn src(&self) -> Option<NodeId> {
        self.route.first().copied()
    }

    /// 获取目标节点
    pub fn dst(&self) -> Option<NodeId> {
        self.route.last().copied()
    }

    /// 获取当前所在节点
    pub fn at(&self) -> Option<NodeId> {
        self.route.get(self.hop).copied()
    }

    /// 检查是否有下一跳
    pub fn has_next(&self) -> bool {
        self.hop + 1 < self.route.len()
    }

    /// 获取下一跳节点（如果有）
    pub fn next(&self) -> Option<NodeId> {
        self.route.get(self.hop + 1).copied()
    }

    /// 前进到下一跳
    pub fn advance(mut self) -> Self {
        self.hop += 1;
        self
    }
}
