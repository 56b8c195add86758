//! 调度器接口
//!
//! 事件处理逻辑（应用、网络）只通过该 trait 与事件队列交互，
//! 不依赖 `Simulator` 的内部表示。

use super::event::Event;
use super::scheduled_event::EventId;
use super::simulator::Simulator;
use super::time::SimTime;

/// 可在 `now + delay` 安排事件、并在触发前取消事件的调度环境。
pub trait Scheduler {
    /// 当前仿真时间
    fn now(&self) -> SimTime;

    /// 在 `delay` 之后执行 `ev`，返回可取消的句柄。
    fn schedule_after(&mut self, delay: SimTime, ev: Box<dyn Event>) -> EventId;

    /// 取消尚未触发的事件；若事件已执行或已取消则返回 false。
    fn cancel(&mut self, id: EventId) -> bool;
}

impl Scheduler for Simulator {
    fn now(&self) -> SimTime {
        Simulator::now(self)
    }

    fn schedule_after(&mut self, delay: SimTime, ev: Box<dyn Event>) -> EventId {
        let at = Simulator::now(self).saturating_add(delay);
        self.push(at, ev)
    }

    fn cancel(&mut self, id: EventId) -> bool {
        Simulator::cancel(self, id)
    }
}
