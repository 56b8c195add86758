//! 自调度的恒定比特率发送端
//!
//! 每次发送既是一次数据发送，也是对下一次发送的调度决定：
//! 间隔 = 刚发送的载荷字节数 * 8 / 当前目标速率。因此速率变更从下一次
//! 调度开始生效，已经排好的发送不受影响。

use serde::Serialize;
use tracing::{debug, info, trace};

use super::config::PacedConfig;
use super::{AppError, AppId};
use crate::net::{Connection, DataRate, Endpoint};
use crate::sim::{Event, EventId, Scheduler, SimTime};

/// 为应用构造“下一次发送”事件的函数
pub type TickFn = fn(AppId) -> Box<dyn Event>;

/// 应用操作所需的上下文：调度器、传输环境、以及发送事件的构造器。
pub struct AppCtx<'a, E: ?Sized> {
    pub sched: &'a mut dyn Scheduler,
    pub env: &'a mut E,
    pub tick: TickFn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Configured,
    Running,
    /// 已发完全部载荷，仍持有连接
    Idle,
    Stopped,
}

/// 以目标平均速率发送定长（或按序变长）载荷的应用
#[derive(Debug)]
pub struct PacedSource<C: Connection> {
    id: AppId,
    conn: Option<C>,
    peer: Endpoint,
    cfg: PacedConfig,
    state: AppState,
    units_sent: u64,
    bytes_sent: u64,
    send_failures: u64,
    send_event: Option<EventId>,
    first_sent_at: Option<SimTime>,
    last_sent_at: Option<SimTime>,
}

impl<C: Connection> PacedSource<C> {
    pub fn configure(id: AppId, conn: C, peer: Endpoint, cfg: PacedConfig) -> Result<Self, AppError> {
        cfg.validate()?;
        Ok(Self {
            id,
            conn: Some(conn),
            peer,
            cfg,
            state: AppState::Configured,
            units_sent: 0,
            bytes_sent: 0,
            send_failures: 0,
            send_event: None,
            first_sent_at: None,
            last_sent_at: None,
        })
    }

    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn peer(&self) -> Endpoint {
        self.peer
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn config(&self) -> &PacedConfig {
        &self.cfg
    }

    pub fn rate(&self) -> DataRate {
        self.cfg.rate
    }

    pub fn units_sent(&self) -> u64 {
        self.units_sent
    }

    /// 被传输层接受的字节数
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures
    }

    pub fn first_sent_at(&self) -> Option<SimTime> {
        self.first_sent_at
    }

    pub fn last_sent_at(&self) -> Option<SimTime> {
        self.last_sent_at
    }

    /// 已调度但尚未触发的下一次发送
    pub fn pending_send(&self) -> Option<EventId> {
        self.send_event
    }

    /// 会话持有的连接（stop 之后为 None）
    pub fn connection(&self) -> Option<&C> {
        self.conn.as_ref()
    }

    /// 建立连接并立即发送第一个载荷。
    #[tracing::instrument(skip(self, cx), fields(app = %self.id, peer = %self.peer))]
    pub fn start(&mut self, cx: &mut AppCtx<'_, C::Env>) -> Result<(), AppError> {
        let conn = match (self.state, self.conn.as_mut()) {
            (AppState::Configured, Some(conn)) => conn,
            (state, _) => {
                return Err(AppError::PreconditionViolation {
                    app: self.id,
                    op: "start",
                    state,
                });
            }
        };
        conn.bind(cx.env)?;
        conn.connect(self.peer, cx.env)?;

        self.state = AppState::Running;
        self.units_sent = 0;
        info!(rate = %self.cfg.rate, limit = ?self.cfg.limit, now = ?cx.sched.now(), "paced source started");

        self.emit(cx);
        Ok(())
    }

    /// 停止发送：取消未触发的发送并关闭连接。可重复调用。
    ///
    /// 第一次调用把（已关闭的）连接交还给调用者，之后返回 None。
    #[tracing::instrument(skip(self, cx), fields(app = %self.id))]
    pub fn stop(&mut self, cx: &mut AppCtx<'_, C::Env>) -> Option<C> {
        if let Some(ev) = self.send_event.take() {
            let cancelled = cx.sched.cancel(ev);
            trace!(cancelled, "取消待发送事件");
        }
        if self.state != AppState::Stopped {
            info!(units_sent = self.units_sent, bytes_sent = self.bytes_sent, "paced source stopped");
            self.state = AppState::Stopped;
        }
        let mut conn = self.conn.take()?;
        conn.close(cx.env);
        Some(conn)
    }

    /// 更新目标速率；已排好的下一次发送时间不变。
    pub fn change_rate(&mut self, rate: DataRate) -> Result<(), AppError> {
        if rate.is_zero() {
            return Err(AppError::InvalidConfiguration("target rate must be positive"));
        }
        debug!(app = %self.id, old = %self.cfg.rate, new = %rate, "change rate");
        self.cfg.rate = rate;
        Ok(())
    }

    /// 已调度的发送事件触发
    pub fn on_tick(&mut self, cx: &mut AppCtx<'_, C::Env>) {
        self.send_event = None;
        self.emit(cx);
    }

    fn emit(&mut self, cx: &mut AppCtx<'_, C::Env>) {
        if self.state != AppState::Running {
            return;
        }
        let Some(conn) = self.conn.as_mut() else {
            return;
        };

        let now = cx.sched.now();
        let size = self.cfg.payload.size_for(self.units_sent);
        match conn.send(size, cx.sched, cx.env) {
            Ok(n) => self.bytes_sent += n as u64,
            Err(e) => {
                // 发送失败不重试，节奏照常
                self.send_failures += 1;
                debug!(app = %self.id, error = %e, "send failed");
            }
        }
        self.units_sent += 1;
        self.first_sent_at.get_or_insert(now);
        self.last_sent_at = Some(now);

        if self.cfg.limit.allows_more(self.units_sent) {
            let delay = self.cfg.rate.tx_time(size);
            trace!(app = %self.id, units_sent = self.units_sent, ?delay, "schedule next send");
            self.send_event = Some(cx.sched.schedule_after(delay, (cx.tick)(self.id)));
        } else {
            info!(app = %self.id, units_sent = self.units_sent, now = ?now, "all units sent; idle");
            self.state = AppState::Idle;
        }
    }
}
