//! 实验场景
//!
//! 用 JSON 描述拓扑与一组 paced source，构建并运行仿真，输出按应用与按流的统计。

mod run;
mod spec;

pub use run::{AppReport, FlowReport, ScenarioError, ScenarioReport, run_scenario};
pub use spec::{AppSpec, LinkSpec, RateChangeSpec, ScenarioSpec, TopologySpec};
