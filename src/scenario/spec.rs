use std::path::Path;

use serde::{Deserialize, Serialize};

use super::run::ScenarioError;
use crate::net::DataRate;
use crate::sim::SimTime;
use crate::topo::P2pOpts;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    #[serde(default)]
    pub topology: TopologySpec,
    /// 瓶颈链路（两个方向）出口队列容量，单位为包；不填表示不限
    #[serde(default)]
    pub queue_pkts: Option<u64>,
    /// 仿真运行到多少秒
    #[serde(default = "default_until_s")]
    pub until_s: f64,
    #[serde(default)]
    pub apps: Vec<AppSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopologySpec {
    /// n0 - n1 = n2 - n3
    Chain {
        #[serde(default)]
        access: Option<LinkSpec>,
        #[serde(default)]
        bottleneck: Option<LinkSpec>,
    },
    /// n0,n1 - n4 = n5 - n2,n3
    Dumbbell {
        #[serde(default)]
        access: Option<LinkSpec>,
        #[serde(default)]
        bottleneck: Option<LinkSpec>,
    },
}

impl Default for TopologySpec {
    fn default() -> Self {
        TopologySpec::Chain {
            access: None,
            bottleneck: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinkSpec {
    pub rate: DataRate,
    pub delay_ms: f64,
}

impl LinkSpec {
    /// 速率必须为正，时延必须是有限的非负数
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.rate.is_zero() {
            return Err("link rate must be positive");
        }
        if !self.delay_ms.is_finite() || self.delay_ms < 0.0 {
            return Err("delay_ms must be finite and non-negative");
        }
        Ok(())
    }

    pub(crate) fn to_opts(self) -> P2pOpts {
        // 整数毫秒走整数换算，不经过浮点
        let delay = if self.delay_ms.fract() == 0.0 {
            SimTime::from_millis(self.delay_ms as u64)
        } else {
            SimTime::from_secs_f64(self.delay_ms / 1e3)
        };
        P2pOpts::new(self.rate, delay)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSpec {
    /// 源节点编号（拓扑中的 ni）
    pub src: usize,
    /// 目的节点编号
    pub dst: usize,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_payload_bytes")]
    pub payload_bytes: u32,
    /// 变长载荷序列；给出时优先于 `payload_bytes`
    #[serde(default)]
    pub payload_cycle: Option<Vec<u32>>,
    /// 载荷个数上限；`null` 表示不限
    #[serde(default = "default_units")]
    pub units: Option<u64>,
    #[serde(default = "default_rate")]
    pub rate: DataRate,
    #[serde(default)]
    pub start_s: f64,
    #[serde(default)]
    pub stop_s: Option<f64>,
    /// 发送缓冲上限（字节）
    #[serde(default)]
    pub snd_buf_bytes: Option<u64>,
    #[serde(default)]
    pub rate_changes: Vec<RateChangeSpec>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateChangeSpec {
    pub at_s: f64,
    pub rate: DataRate,
}

fn default_until_s() -> f64 {
    15.0
}

fn default_port() -> u16 {
    8081
}

fn default_payload_bytes() -> u32 {
    1040
}

fn default_units() -> Option<u64> {
    Some(1_000_000)
}

fn default_rate() -> DataRate {
    DataRate::from_mbps(20)
}

impl AppSpec {
    /// 使用默认参数、从 `src` 发往 `dst` 的应用
    pub fn new(src: usize, dst: usize) -> Self {
        Self {
            src,
            dst,
            port: default_port(),
            payload_bytes: default_payload_bytes(),
            payload_cycle: None,
            units: default_units(),
            rate: default_rate(),
            start_s: 0.0,
            stop_s: None,
            snd_buf_bytes: None,
            rate_changes: Vec::new(),
        }
    }
}

impl ScenarioSpec {
    pub fn from_json_str(s: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}
