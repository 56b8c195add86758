//! DropTail（尾丢弃）FIFO 队列
//!
//! 先进先出；当剩余容量不足以容纳新到达的 packet 时直接丢弃它。

use std::collections::VecDeque;

use crate::net::Packet;

use super::PacketQueue;

#[derive(Debug)]
pub struct DropTailQueue {
    max_bytes: u64,
    cur_bytes: u64,
    drops: u64,
    q: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            cur_bytes: 0,
            drops: 0,
            q: VecDeque::new(),
        }
    }

    /// 累计尾丢弃的 packet 数
    pub fn drops(&self) -> u64 {
        self.drops
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        let after = self.cur_bytes.saturating_add(pkt.size_bytes as u64);
        if after > self.max_bytes {
            self.drops += 1;
            return Err(pkt);
        }
        self.cur_bytes = after;
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(pkt.size_bytes as u64);
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    fn capacity_bytes(&self) -> u64 {
        self.max_bytes
    }
}
