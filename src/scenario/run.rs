use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::spec::{AppSpec, ScenarioSpec, TopologySpec};
use crate::app::{AppChangeRate, AppError, AppId, AppState, PacedConfig, PayloadSizing, install};
use crate::net::{Endpoint, FlowStats, NetWorld, SimSocket};
use crate::queue::mem_from_pkt;
use crate::sim::{SimTime, Simulator};
use crate::topo::Topology;
use crate::topo::chain::{ChainOpts, build_chain};
use crate::topo::dumbbell::{DumbbellOpts, build_dumbbell};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("app #{index}: node index {node} out of range ({nodes} nodes)")]
    UnknownNode { index: usize, node: usize, nodes: usize },
    #[error("app #{index}: {reason}")]
    InvalidTiming { index: usize, reason: &'static str },
    #[error("until_s must be finite and non-negative")]
    InvalidUntil,
    #[error("{link} link: {reason}")]
    InvalidLink { link: &'static str, reason: &'static str },
    #[error("app #{index}: {source}")]
    App {
        index: usize,
        #[source]
        source: AppError,
    },
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid scenario json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct AppReport {
    pub app: AppId,
    pub src: usize,
    pub dst: usize,
    pub state: AppState,
    pub flow_id: Option<u64>,
    pub units_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
    pub first_sent_s: Option<f64>,
    pub last_sent_s: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub flow_id: u64,
    #[serde(flatten)]
    pub stats: FlowStats,
    pub throughput_bps: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub final_time: SimTime,
    pub delivered_pkts: u64,
    pub dropped_pkts: u64,
    pub apps: Vec<AppReport>,
    pub flows: Vec<FlowReport>,
}

impl ScenarioReport {
    pub fn flow(&self, flow_id: u64) -> Option<&FlowReport> {
        self.flows.iter().find(|f| f.flow_id == flow_id)
    }

    /// 某个应用所属流的统计
    pub fn app_flow(&self, app: AppId) -> Option<&FlowReport> {
        let flow_id = self.apps.iter().find(|a| a.app == app)?.flow_id?;
        self.flow(flow_id)
    }
}

fn secs(index: usize, s: f64, reason: &'static str) -> Result<SimTime, ScenarioError> {
    if !s.is_finite() || s < 0.0 {
        return Err(ScenarioError::InvalidTiming { index, reason });
    }
    Ok(SimTime::from_secs_f64(s))
}

fn validate_topology(spec: &TopologySpec) -> Result<(), ScenarioError> {
    let (TopologySpec::Chain { access, bottleneck } | TopologySpec::Dumbbell { access, bottleneck }) = spec;
    for (link, l) in [("access", access), ("bottleneck", bottleneck)] {
        if let Some(l) = l {
            l.validate()
                .map_err(|reason| ScenarioError::InvalidLink { link, reason })?;
        }
    }
    Ok(())
}

fn build_topology(world: &mut NetWorld, spec: &TopologySpec) -> Topology {
    match spec {
        TopologySpec::Chain { access, bottleneck } => {
            let mut opts = ChainOpts::default();
            if let Some(l) = access {
                opts.access = l.to_opts();
            }
            if let Some(l) = bottleneck {
                opts.bottleneck = l.to_opts();
            }
            build_chain(world, &opts)
        }
        TopologySpec::Dumbbell { access, bottleneck } => {
            let mut opts = DumbbellOpts::default();
            if let Some(l) = access {
                opts.access = l.to_opts();
            }
            if let Some(l) = bottleneck {
                opts.bottleneck = l.to_opts();
            }
            build_dumbbell(world, &opts)
        }
    }
}

/// 配置一个应用并安排其生命周期事件
fn install_app(
    index: usize,
    spec: &AppSpec,
    topo: &Topology,
    sim: &mut Simulator,
    world: &mut NetWorld,
) -> Result<AppId, ScenarioError> {
    let node = |n: usize| {
        topo.nodes.get(n).copied().ok_or(ScenarioError::UnknownNode {
            index,
            node: n,
            nodes: topo.nodes.len(),
        })
    };
    let (src, dst) = (node(spec.src)?, node(spec.dst)?);

    let start = secs(index, spec.start_s, "start_s must be finite and non-negative")?;
    let stop = spec
        .stop_s
        .map(|s| secs(index, s, "stop_s must be finite and non-negative"))
        .transpose()?;
    if stop.is_some_and(|stop| stop < start) {
        return Err(ScenarioError::InvalidTiming {
            index,
            reason: "stop_s precedes start_s",
        });
    }

    let payload = match &spec.payload_cycle {
        Some(sizes) => PayloadSizing::Cycle(sizes.clone()),
        None => PayloadSizing::Fixed(spec.payload_bytes),
    };
    let cfg = PacedConfig {
        payload,
        limit: spec.units.into(),
        rate: spec.rate,
    };

    let peer = Endpoint::new(dst, spec.port);
    world.net.listen(peer);
    let sock = SimSocket::new(src).with_send_buffer(spec.snd_buf_bytes);
    let app = world
        .apps
        .insert(sock, peer, cfg)
        .map_err(|source| ScenarioError::App { index, source })?;

    install::<NetWorld>(sim, app, start, stop);
    for rc in &spec.rate_changes {
        let at = secs(index, rc.at_s, "rate change time must be finite and non-negative")?;
        sim.schedule(at, AppChangeRate::<NetWorld>::new(app, rc.rate));
    }
    debug!(%app, %peer, ?start, ?stop, "app installed");
    Ok(app)
}

/// 构建并运行一个场景
#[tracing::instrument(skip(spec), fields(apps = spec.apps.len()))]
pub fn run_scenario(spec: &ScenarioSpec) -> Result<ScenarioReport, ScenarioError> {
    if !spec.until_s.is_finite() || spec.until_s < 0.0 {
        return Err(ScenarioError::InvalidUntil);
    }
    let until = SimTime::from_secs_f64(spec.until_s);
    validate_topology(&spec.topology)?;

    let mut sim = Simulator::default();
    let mut world = NetWorld::default();
    let topo = build_topology(&mut world, &spec.topology);

    if let Some(pkts) = spec.queue_pkts {
        let (a, b) = topo.bottleneck;
        let cap = mem_from_pkt(pkts);
        world.net.set_link_queue_capacity_bytes(a, b, cap);
        world.net.set_link_queue_capacity_bytes(b, a, cap);
    }

    let ids = spec
        .apps
        .iter()
        .enumerate()
        .map(|(i, app)| install_app(i, app, &topo, &mut sim, &mut world))
        .collect::<Result<Vec<_>, _>>()?;

    info!(nodes = topo.nodes.len(), ?until, "running scenario");
    sim.run_until(until, &mut world);

    let apps = ids
        .iter()
        .zip(&spec.apps)
        .filter_map(|(&id, app_spec)| {
            let app = world.apps.get(id)?;
            Some(AppReport {
                app: id,
                src: app_spec.src,
                dst: app_spec.dst,
                state: app.state(),
                flow_id: world.apps.connection(id).and_then(SimSocket::flow_id),
                units_sent: app.units_sent(),
                bytes_sent: app.bytes_sent(),
                send_failures: app.send_failures(),
                first_sent_s: app.first_sent_at().map(SimTime::as_secs_f64),
                last_sent_s: app.last_sent_at().map(SimTime::as_secs_f64),
            })
        })
        .collect();

    let flows = world
        .net
        .stats
        .flows
        .iter()
        .map(|(&flow_id, stats)| FlowReport {
            flow_id,
            throughput_bps: stats.throughput_bps(),
            stats: stats.clone(),
        })
        .collect();

    Ok(ScenarioReport {
        final_time: sim.now(),
        delivered_pkts: world.net.stats.delivered_pkts,
        dropped_pkts: world.net.stats.dropped_pkts,
        apps,
        flows,
    })
}

