//! 链路类型
//!
//! 定义单向链路：传播时延、速率、发送忙碌时间以及出口队列。

use super::id::NodeId;
use super::rate::DataRate;
use crate::queue::{DropTailQueue, PacketQueue};
use crate::sim::SimTime;

/// 网络链路
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub latency: SimTime,
    pub rate: DataRate,
    /// 当前正在序列化的 packet 何时离开
    pub busy_until: SimTime,
    /// 出口 FIFO 队列（默认容量极大，即不丢包）
    pub queue: Box<dyn PacketQueue>,
}

impl Link {
    /// 创建新链路
    pub fn new(from: NodeId, to: NodeId, latency: SimTime, rate: DataRate) -> Self {
        Self {
            from,
            to,
            latency,
            rate,
            busy_until: SimTime::ZERO,
            queue: Box::new(DropTailQueue::new(u64::MAX)),
        }
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        self.rate.tx_time(bytes)
    }

    /// 在 `now` 时刻是否需要排队（正在发送或队列非空）
    pub(crate) fn is_busy(&self, now: SimTime) -> bool {
        self.busy_until > now || !self.queue.is_empty()
    }
}
