use std::any::Any;

use crate::app::{
    AppChangeRate, AppError, AppHost, AppId, AppStack, AppState, PacedConfig, PayloadSizing, UnitLimit, install,
};
use crate::net::{Connection, DataRate, Endpoint, NodeId, TransportError};
use crate::sim::{Scheduler, SimTime, Simulator, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Bind,
    Connect(Endpoint),
    Send(u32),
    Close,
}

/// 记录调用顺序的假传输环境
#[derive(Debug, Default)]
struct MockNet {
    calls: Vec<Call>,
    send_times: Vec<SimTime>,
    fail_bind: bool,
    fail_sends: bool,
}

impl MockNet {
    fn closes(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Close).count()
    }
}

#[derive(Debug)]
struct MockConn;

impl Connection for MockConn {
    type Env = MockNet;

    fn bind(&mut self, env: &mut MockNet) -> Result<Endpoint, TransportError> {
        env.calls.push(Call::Bind);
        if env.fail_bind {
            return Err(TransportError::AddressInUse(NodeId(0)));
        }
        Ok(Endpoint::new(NodeId(0), 49152))
    }

    fn connect(&mut self, peer: Endpoint, env: &mut MockNet) -> Result<(), TransportError> {
        env.calls.push(Call::Connect(peer));
        Ok(())
    }

    fn send(&mut self, len: u32, sched: &mut dyn Scheduler, env: &mut MockNet) -> Result<u32, TransportError> {
        env.calls.push(Call::Send(len));
        env.send_times.push(sched.now());
        if env.fail_sends {
            return Err(TransportError::BufferFull {
                queued: 0,
                len,
                capacity: 0,
            });
        }
        Ok(len)
    }

    fn close(&mut self, env: &mut MockNet) {
        env.calls.push(Call::Close);
    }
}

struct TestWorld {
    net: MockNet,
    apps: AppStack<MockConn>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            net: MockNet::default(),
            apps: AppStack::for_host::<TestWorld>(),
        }
    }
}

impl World for TestWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl AppHost for TestWorld {
    type Conn = MockConn;

    fn app_parts(&mut self) -> (&mut AppStack<MockConn>, &mut MockNet) {
        (&mut self.apps, &mut self.net)
    }
}

fn peer() -> Endpoint {
    Endpoint::new(NodeId(3), 8081)
}

fn setup(cfg: PacedConfig) -> (Simulator, TestWorld, AppId) {
    let mut world = TestWorld::default();
    let app = world.apps.insert(MockConn, peer(), cfg).expect("valid config");
    (Simulator::default(), world, app)
}

fn secs(v: &[f64]) -> Vec<SimTime> {
    v.iter().map(|&s| SimTime::from_secs_f64(s)).collect()
}

#[test]
fn five_units_are_paced_one_second_apart_then_idle() {
    let cfg = PacedConfig::new(1040, UnitLimit::Finite(5), DataRate::from_bps(8320));
    let (mut sim, mut world, app) = setup(cfg);
    install::<TestWorld>(&mut sim, app, SimTime::from_secs(2), None);
    sim.run(&mut world);

    assert_eq!(world.net.send_times, secs(&[2.0, 3.0, 4.0, 5.0, 6.0]));
    let src = world.apps.get(app).expect("app");
    assert_eq!(src.state(), AppState::Idle);
    assert_eq!(src.units_sent(), 5);
    assert_eq!(src.bytes_sent(), 5 * 1040);
    assert_eq!(src.pending_send(), None);
    assert_eq!(src.first_sent_at(), Some(SimTime::from_secs(2)));
    assert_eq!(src.last_sent_at(), Some(SimTime::from_secs(6)));
    // idle 状态仍持有连接
    assert!(src.connection().is_some());
    assert_eq!(world.net.closes(), 0);
    assert_eq!(sim.pending_events(), 0);
}

#[test]
fn single_unit_sends_once_and_leaves_nothing_pending() {
    let cfg = PacedConfig::new(100, UnitLimit::Finite(1), DataRate::from_kbps(1));
    let (mut sim, mut world, app) = setup(cfg);
    install::<TestWorld>(&mut sim, app, SimTime::ZERO, None);
    sim.run(&mut world);

    assert_eq!(world.net.send_times, vec![SimTime::ZERO]);
    let src = world.apps.get(app).expect("app");
    assert_eq!(src.state(), AppState::Idle);
    assert_eq!(src.pending_send(), None);
    assert_eq!(sim.pending_events(), 0);
}

#[test]
fn rate_change_applies_from_the_next_scheduling_decision() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (mut sim, mut world, app) = setup(cfg);
    install::<TestWorld>(&mut sim, app, SimTime::ZERO, None);
    // 发送 @1.0 已按旧速率排好，不受影响
    sim.schedule(
        SimTime::from_millis(500),
        AppChangeRate::<TestWorld>::new(app, DataRate::from_bps(16000)),
    );
    sim.run_until(SimTime::from_secs(2), &mut world);

    assert_eq!(world.net.send_times, secs(&[0.0, 1.0, 1.5, 2.0]));
    let src = world.apps.get(app).expect("app");
    assert_eq!(src.rate(), DataRate::from_bps(16000));
    assert_eq!(src.state(), AppState::Running);
    assert!(src.pending_send().is_some());
}

#[test]
fn cycle_sizing_uses_the_size_just_sent_for_the_gap() {
    let mut cfg = PacedConfig::new(1, UnitLimit::Finite(4), DataRate::from_bps(8000));
    cfg.payload = PayloadSizing::Cycle(vec![500, 1000]);
    let (mut sim, mut world, app) = setup(cfg);
    install::<TestWorld>(&mut sim, app, SimTime::ZERO, None);
    sim.run(&mut world);

    assert_eq!(world.net.send_times, secs(&[0.0, 0.5, 1.5, 2.0]));
    let sizes: Vec<_> = world
        .net
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Send(n) => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![500, 1000, 500, 1000]);
    assert_eq!(world.apps.get(app).map(|s| s.bytes_sent()), Some(3000));
}

#[test]
fn stop_cancels_the_pending_send() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (mut sim, mut world, app) = setup(cfg);
    install::<TestWorld>(&mut sim, app, SimTime::ZERO, Some(SimTime::from_millis(2500)));
    sim.run(&mut world);

    assert_eq!(world.net.send_times, secs(&[0.0, 1.0, 2.0]));
    let src = world.apps.get(app).expect("app");
    assert_eq!(src.state(), AppState::Stopped);
    assert_eq!(src.units_sent(), 3);
    assert_eq!(src.pending_send(), None);
    assert!(src.connection().is_none());
    assert_eq!(world.net.closes(), 1);
    assert_eq!(sim.pending_events(), 0);
}

#[test]
fn stop_tied_with_a_send_runs_first_when_scheduled_first() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (mut sim, mut world, app) = setup(cfg);
    // stop 在安装时就排入队列，早于 t=1s 才排入的 t=2s 发送
    install::<TestWorld>(&mut sim, app, SimTime::ZERO, Some(SimTime::from_secs(2)));
    sim.run(&mut world);

    assert_eq!(world.net.send_times, secs(&[0.0, 1.0]));
}

#[test]
fn send_that_already_fired_counts_and_only_its_successor_is_cancelled() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (mut sim, mut world, app) = setup(cfg);
    let stop_at = SimTime::from_secs(2).saturating_add(SimTime(1));
    install::<TestWorld>(&mut sim, app, SimTime::ZERO, Some(stop_at));
    sim.run(&mut world);

    assert_eq!(world.net.send_times, secs(&[0.0, 1.0, 2.0]));
    assert_eq!(world.apps.get(app).map(|s| s.units_sent()), Some(3));
}

#[test]
fn stop_is_idempotent_and_closes_exactly_once() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (mut sim, mut world, app) = setup(cfg);
    world.apps.start(app, &mut sim, &mut world.net).expect("start");

    assert_eq!(world.apps.stop(app, &mut sim, &mut world.net), Ok(true));
    assert_eq!(world.apps.stop(app, &mut sim, &mut world.net), Ok(false));
    assert_eq!(world.net.closes(), 1);
    assert_eq!(sim.pending_events(), 0);

    // 连接交还给栈，可以取走一次
    assert!(world.apps.connection(app).is_some());
    assert!(world.apps.take_released(app).is_some());
    assert!(world.apps.take_released(app).is_none());
}

#[test]
fn transport_calls_follow_bind_connect_send_close() {
    let cfg = PacedConfig::new(64, UnitLimit::Finite(2), DataRate::from_kbps(8));
    let (mut sim, mut world, app) = setup(cfg);
    install::<TestWorld>(&mut sim, app, SimTime::ZERO, Some(SimTime::from_secs(1)));
    sim.run(&mut world);

    assert_eq!(
        world.net.calls,
        vec![Call::Bind, Call::Connect(peer()), Call::Send(64), Call::Send(64), Call::Close]
    );
}

#[test]
fn start_twice_or_after_stop_is_a_precondition_violation() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (mut sim, mut world, app) = setup(cfg);
    world.apps.start(app, &mut sim, &mut world.net).expect("start");

    assert_eq!(
        world.apps.start(app, &mut sim, &mut world.net),
        Err(AppError::PreconditionViolation {
            app,
            op: "start",
            state: AppState::Running
        })
    );
    assert_eq!(world.apps.get(app).map(|s| s.units_sent()), Some(1));
    assert_eq!(sim.pending_events(), 1);

    world.apps.stop(app, &mut sim, &mut world.net).expect("stop");
    assert!(matches!(
        world.apps.start(app, &mut sim, &mut world.net),
        Err(AppError::PreconditionViolation {
            state: AppState::Stopped,
            ..
        })
    ));
    assert_eq!(world.net.send_times.len(), 1);
}

#[test]
fn failed_sends_are_counted_and_pacing_continues() {
    let cfg = PacedConfig::new(1000, UnitLimit::Finite(3), DataRate::from_bps(8000));
    let (mut sim, mut world, app) = setup(cfg);
    world.net.fail_sends = true;
    install::<TestWorld>(&mut sim, app, SimTime::ZERO, None);
    sim.run(&mut world);

    assert_eq!(world.net.send_times, secs(&[0.0, 1.0, 2.0]));
    let src = world.apps.get(app).expect("app");
    assert_eq!(src.units_sent(), 3);
    assert_eq!(src.send_failures(), 3);
    assert_eq!(src.bytes_sent(), 0);
    assert_eq!(src.state(), AppState::Idle);
}

#[test]
fn bind_failure_leaves_the_source_configured() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (mut sim, mut world, app) = setup(cfg);
    world.net.fail_bind = true;

    let err = world.apps.start(app, &mut sim, &mut world.net);
    assert_eq!(err, Err(AppError::Transport(TransportError::AddressInUse(NodeId(0)))));
    let src = world.apps.get(app).expect("app");
    assert_eq!(src.state(), AppState::Configured);
    assert_eq!(src.pending_send(), None);
    assert!(world.net.send_times.is_empty());
}

#[test]
fn invalid_configurations_are_rejected() {
    let mut apps: AppStack<MockConn> = AppStack::for_host::<TestWorld>();
    let rate = DataRate::from_kbps(8);
    let bad = [
        PacedConfig::new(0, UnitLimit::Unbounded, rate),
        PacedConfig::new(100, UnitLimit::Unbounded, DataRate::from_bps(0)),
        PacedConfig::new(100, UnitLimit::Finite(0), rate),
        PacedConfig {
            payload: PayloadSizing::Cycle(Vec::new()),
            limit: UnitLimit::Unbounded,
            rate,
        },
        PacedConfig {
            payload: PayloadSizing::Cycle(vec![100, 0]),
            limit: UnitLimit::Unbounded,
            rate,
        },
    ];
    for cfg in bad {
        assert!(
            matches!(apps.insert(MockConn, peer(), cfg.clone()), Err(AppError::InvalidConfiguration(_))),
            "{cfg:?} accepted"
        );
    }
    assert!(apps.is_empty());
}

#[test]
fn zero_rate_change_is_rejected_and_keeps_the_old_rate() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (_sim, mut world, app) = setup(cfg);

    assert!(matches!(
        world.apps.change_rate(app, DataRate::from_bps(0)),
        Err(AppError::InvalidConfiguration(_))
    ));
    assert_eq!(world.apps.get(app).map(|s| s.rate()), Some(DataRate::from_bps(8000)));
}

#[test]
fn operations_on_unknown_app_fail() {
    let cfg = PacedConfig::new(1000, UnitLimit::Unbounded, DataRate::from_bps(8000));
    let (mut sim, mut world, _app) = setup(cfg);
    let ghost = AppId(42);

    assert_eq!(
        world.apps.start(ghost, &mut sim, &mut world.net),
        Err(AppError::UnknownApp(ghost))
    );
    assert_eq!(
        world.apps.stop(ghost, &mut sim, &mut world.net),
        Err(AppError::UnknownApp(ghost))
    );
    assert_eq!(
        world.apps.change_rate(ghost, DataRate::from_bps(1)),
        Err(AppError::UnknownApp(ghost))
    );
}

#[test]
fn unit_limit_and_sizing_helpers() {
    assert_eq!(UnitLimit::from(Some(3)), UnitLimit::Finite(3));
    assert_eq!(UnitLimit::from(None), UnitLimit::Unbounded);
    assert!(UnitLimit::Finite(3).allows_more(2));
    assert!(!UnitLimit::Finite(3).allows_more(3));
    assert!(UnitLimit::Unbounded.allows_more(u64::MAX));

    let cycle = PayloadSizing::Cycle(vec![10, 20, 30]);
    assert_eq!(cycle.size_for(0), 10);
    assert_eq!(cycle.size_for(4), 20);
    assert_eq!(PayloadSizing::Fixed(7).size_for(99), 7);
}
