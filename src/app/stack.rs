//! 应用栈：按 `AppId` 管理一组 paced source

use std::collections::BTreeMap;

use super::config::PacedConfig;
use super::events::{AppHost, send_tick};
use super::paced::{AppCtx, PacedSource, TickFn};
use super::{AppError, AppId};
use crate::net::{Connection, DataRate, Endpoint};
use crate::sim::Scheduler;

/// 应用栈：`stop` 之后交还的连接由栈保管，直到调用者取走。
pub struct AppStack<C: Connection> {
    apps: BTreeMap<AppId, PacedSource<C>>,
    released: BTreeMap<AppId, C>,
    next_id: u64,
    tick: TickFn,
}

impl<C: Connection> AppStack<C> {
    /// `tick` 用于构造“应用 X 的下一次发送”事件
    pub fn new(tick: TickFn) -> Self {
        Self {
            apps: BTreeMap::new(),
            released: BTreeMap::new(),
            next_id: 0,
            tick,
        }
    }

    /// 发送事件回到宿主世界 `W` 中的这个应用栈
    pub fn for_host<W: AppHost<Conn = C>>() -> Self {
        Self::new(send_tick::<W>)
    }

    /// 配置一个新应用（未启动）
    pub fn insert(&mut self, conn: C, peer: Endpoint, cfg: PacedConfig) -> Result<AppId, AppError> {
        let id = AppId(self.next_id);
        let app = PacedSource::configure(id, conn, peer, cfg)?;
        self.next_id += 1;
        self.apps.insert(id, app);
        Ok(id)
    }

    pub fn get(&self, id: AppId) -> Option<&PacedSource<C>> {
        self.apps.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PacedSource<C>> {
        self.apps.values()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    fn app_mut(&mut self, id: AppId) -> Result<&mut PacedSource<C>, AppError> {
        self.apps.get_mut(&id).ok_or(AppError::UnknownApp(id))
    }

    pub fn start(&mut self, id: AppId, sched: &mut dyn Scheduler, env: &mut C::Env) -> Result<(), AppError> {
        let tick = self.tick;
        let mut cx = AppCtx { sched, env, tick };
        self.app_mut(id)?.start(&mut cx)
    }

    /// 停止应用。第一次停止时交还的（已关闭）连接保存在栈中，返回 true。
    pub fn stop(&mut self, id: AppId, sched: &mut dyn Scheduler, env: &mut C::Env) -> Result<bool, AppError> {
        let tick = self.tick;
        let mut cx = AppCtx { sched, env, tick };
        let Some(conn) = self.app_mut(id)?.stop(&mut cx) else {
            return Ok(false);
        };
        self.released.insert(id, conn);
        Ok(true)
    }

    /// 应用当前持有的连接，或 stop 后交还的连接
    pub fn connection(&self, id: AppId) -> Option<&C> {
        self.apps
            .get(&id)
            .and_then(PacedSource::connection)
            .or_else(|| self.released.get(&id))
    }

    /// 取走 stop 后交还的连接
    pub fn take_released(&mut self, id: AppId) -> Option<C> {
        self.released.remove(&id)
    }

    pub fn change_rate(&mut self, id: AppId, rate: DataRate) -> Result<(), AppError> {
        self.app_mut(id)?.change_rate(rate)
    }

    pub fn on_tick(&mut self, id: AppId, sched: &mut dyn Scheduler, env: &mut C::Env) -> Result<(), AppError> {
        let tick = self.tick;
        let mut cx = AppCtx { sched, env, tick };
        self.app_mut(id)?.on_tick(&mut cx);
        Ok(())
    }
}
