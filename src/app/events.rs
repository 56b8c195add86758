//! 驱动应用的仿真事件
//!
//! 事件对宿主世界类型 `W` 泛型：执行时把 `World` 向下转型为 `W`，
//! 再取出应用栈与传输环境。

use std::marker::PhantomData;

use tracing::{debug, error, warn};

use super::AppId;
use super::stack::AppStack;
use crate::net::{Connection, DataRate};
use crate::sim::{Event, SimTime, Simulator, World};

/// 承载应用栈的仿真世界
pub trait AppHost: World + Sized {
    type Conn: Connection;

    fn app_parts(&mut self) -> (&mut AppStack<Self::Conn>, &mut <Self::Conn as Connection>::Env);
}

fn with_apps<W, R>(
    world: &mut dyn World,
    f: impl FnOnce(&mut AppStack<W::Conn>, &mut <W::Conn as Connection>::Env) -> R,
) -> Option<R>
where
    W: AppHost,
{
    let w = world.as_any_mut().downcast_mut::<W>()?;
    let (apps, env) = w.app_parts();
    Some(f(apps, env))
}

fn host_missing<W>(app: AppId) {
    error!(%app, host = std::any::type_name::<W>(), "world is not the expected app host");
}

/// 启动应用
pub struct AppStart<W> {
    pub app: AppId,
    _host: PhantomData<fn() -> W>,
}

impl<W> AppStart<W> {
    pub fn new(app: AppId) -> Self {
        Self { app, _host: PhantomData }
    }
}

impl<W: AppHost> Event for AppStart<W> {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let app = self.app;
        match with_apps::<W, _>(world, |apps, env| apps.start(app, sim, env)) {
            Some(Ok(())) => {}
            Some(Err(e)) => warn!(%app, error = %e, "app start failed"),
            None => host_missing::<W>(app),
        }
    }
}

/// 停止应用
pub struct AppStop<W> {
    pub app: AppId,
    _host: PhantomData<fn() -> W>,
}

impl<W> AppStop<W> {
    pub fn new(app: AppId) -> Self {
        Self { app, _host: PhantomData }
    }
}

impl<W: AppHost> Event for AppStop<W> {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let app = self.app;
        match with_apps::<W, _>(world, |apps, env| apps.stop(app, sim, env)) {
            Some(Ok(released)) => debug!(%app, released, "app stop"),
            Some(Err(e)) => warn!(%app, error = %e, "app stop failed"),
            None => host_missing::<W>(app),
        }
    }
}

/// 修改应用的目标速率
pub struct AppChangeRate<W> {
    pub app: AppId,
    pub rate: DataRate,
    _host: PhantomData<fn() -> W>,
}

impl<W> AppChangeRate<W> {
    pub fn new(app: AppId, rate: DataRate) -> Self {
        Self {
            app,
            rate,
            _host: PhantomData,
        }
    }
}

impl<W: AppHost> Event for AppChangeRate<W> {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        let AppChangeRate { app, rate, .. } = *self;
        match with_apps::<W, _>(world, |apps, _env| apps.change_rate(app, rate)) {
            Some(Ok(())) => {}
            Some(Err(e)) => warn!(%app, error = %e, "rate change rejected"),
            None => host_missing::<W>(app),
        }
    }
}

/// 应用的下一次发送
pub struct AppSend<W> {
    pub app: AppId,
    _host: PhantomData<fn() -> W>,
}

impl<W> AppSend<W> {
    pub fn new(app: AppId) -> Self {
        Self { app, _host: PhantomData }
    }
}

impl<W: AppHost> Event for AppSend<W> {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let app = self.app;
        match with_apps::<W, _>(world, |apps, env| apps.on_tick(app, sim, env)) {
            Some(Ok(())) => {}
            Some(Err(e)) => warn!(%app, error = %e, "send tick dropped"),
            None => host_missing::<W>(app),
        }
    }
}

/// `AppStack::for_host` 使用的发送事件构造器
pub fn send_tick<W: AppHost>(app: AppId) -> Box<dyn Event> {
    Box::new(AppSend::<W>::new(app))
}

/// 安排应用在 `start_at` 启动、在 `stop_at`（若有）停止
pub fn install<W: AppHost>(sim: &mut Simulator, app: AppId, start_at: SimTime, stop_at: Option<SimTime>) {
    sim.schedule(start_at, AppStart::<W>::new(app));
    if let Some(stop_at) = stop_at {
        sim.schedule(stop_at, AppStop::<W>::new(app));
    }
}
