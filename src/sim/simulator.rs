//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列，并支持取消未触发的事件。

use super::event::Event;
use super::scheduled_event::{EventId, ScheduledEvent};
use super::time::SimTime;
use super::world::World;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    // 仍在等待执行的事件序列号；被取消的事件出堆时直接跳过。
    live: HashSet<u64>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) -> EventId {
        self.push(at, Box::new(ev))
    }

    /// 调度事件在 `now + delay` 执行
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) -> EventId {
        let at = self.now.saturating_add(delay);
        self.push(at, Box::new(ev))
    }

    pub(crate) fn push(&mut self, at: SimTime, ev: Box<dyn Event>) -> EventId {
        // 不允许调度到过去
        let at = at.max(self.now);
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.live.insert(seq);
        self.q.push(ScheduledEvent { at, seq, ev });

        debug!(queue_size = self.q.len(), "事件已加入队列");
        EventId(seq)
    }

    /// 取消尚未执行的事件。事件已执行或已被取消时返回 false。
    pub fn cancel(&mut self, id: EventId) -> bool {
        let removed = self.live.remove(&id.0);
        trace!(seq = id.0, removed, "取消事件");
        removed
    }

    /// 事件是否仍在队列中等待执行
    pub fn is_pending(&self, id: EventId) -> bool {
        self.live.contains(&id.0)
    }

    /// 等待执行（未取消）的事件数
    pub fn pending_events(&self) -> usize {
        self.live.len()
    }

    /// 弹出下一个未取消的事件（不超过 `until`）。
    fn pop_live(&mut self, until: SimTime) -> Option<ScheduledEvent> {
        while let Some(top) = self.q.peek() {
            if top.at > until {
                return None;
            }
            let item = self.q.pop()?;
            if self.live.remove(&item.seq) {
                return Some(item);
            }
            trace!(seq = item.seq, "跳过已取消事件");
        }
        None
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(item) = self.pop_live(until) {
            self.now = item.at;
            item.ev.execute(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0u64;
        while let Some(item) = self.pop_live(SimTime::MAX) {
            event_count += 1;
            self.now = item.at;

            debug!(
                event_num = event_count,
                now = ?self.now,
                seq = item.seq,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.ev.execute(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
