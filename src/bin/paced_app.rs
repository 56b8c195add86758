//! 单场景 paced source 实验
//!
//! 从 JSON 场景文件或命令行参数描述的单个应用运行一次仿真，打印汇总。

use clap::{Parser, ValueEnum};
use paced_sim::net::DataRate;
use paced_sim::scenario::{AppSpec, RateChangeSpec, ScenarioReport, ScenarioSpec, TopologySpec, run_scenario};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Topo {
    /// n0 - n1 = n2 - n3
    Chain,
    /// n0,n1 - n4 = n5 - n2,n3
    Dumbbell,
}

#[derive(Debug, Parser)]
#[command(name = "paced-app", about = "恒定比特率 paced source：单场景仿真")]
struct Args {
    /// JSON 场景文件；给出时忽略下面描述单个应用的参数
    #[arg(long)]
    scenario: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Topo::Chain)]
    topology: Topo,

    /// 源节点编号
    #[arg(long, default_value_t = 0)]
    src: usize,

    /// 目的节点编号
    #[arg(long, default_value_t = 3)]
    dst: usize,

    #[arg(long, default_value_t = 8081)]
    port: u16,

    /// 每个载荷的大小（字节）
    #[arg(long, default_value_t = 1040)]
    payload_bytes: u32,

    /// 载荷个数上限；不填表示不限
    #[arg(long)]
    units: Option<u64>,

    /// 目标速率，例如 20Mbps
    #[arg(long, default_value = "20Mbps")]
    rate: DataRate,

    #[arg(long, default_value_t = 1.0)]
    start_s: f64,

    #[arg(long, default_value_t = 10.0)]
    stop_s: f64,

    /// 仿真运行到多少秒
    #[arg(long, default_value_t = 15.0)]
    until_s: f64,

    /// 在该时刻把速率改为 --rate-change-to
    #[arg(long, requires = "rate_change_to")]
    rate_change_at_s: Option<f64>,

    #[arg(long)]
    rate_change_to: Option<DataRate>,

    /// 发送缓冲上限（字节）
    #[arg(long)]
    snd_buf_bytes: Option<u64>,

    /// 瓶颈链路队列大小（包）；不填表示不限
    #[arg(long)]
    queue_pkts: Option<u64>,

    /// 把完整报告写成 JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

impl Args {
    fn to_spec(&self) -> ScenarioSpec {
        let mut app = AppSpec::new(self.src, self.dst);
        app.port = self.port;
        app.payload_bytes = self.payload_bytes;
        app.units = self.units;
        app.rate = self.rate;
        app.start_s = self.start_s;
        app.stop_s = Some(self.stop_s);
        app.snd_buf_bytes = self.snd_buf_bytes;
        if let (Some(at_s), Some(rate)) = (self.rate_change_at_s, self.rate_change_to) {
            app.rate_changes.push(RateChangeSpec { at_s, rate });
        }

        let topology = match self.topology {
            Topo::Chain => TopologySpec::Chain {
                access: None,
                bottleneck: None,
            },
            Topo::Dumbbell => TopologySpec::Dumbbell {
                access: None,
                bottleneck: None,
            },
        };
        ScenarioSpec {
            topology,
            queue_pkts: self.queue_pkts,
            until_s: self.until_s,
            apps: vec![app],
        }
    }
}

fn print_summary(report: &ScenarioReport) {
    println!("done @ {:.6}s", report.final_time.as_secs_f64());
    for a in &report.apps {
        let tput = report.app_flow(a.app).and_then(|f| f.throughput_bps);
        println!(
            "  {}: n{}->n{} state={:?} units_sent={} bytes_sent={} send_failures={} throughput_kbps={}",
            a.app,
            a.src,
            a.dst,
            a.state,
            a.units_sent,
            a.bytes_sent,
            a.send_failures,
            tput.map_or_else(|| "-".to_string(), |bps| format!("{:.3}", bps / 1000.0)),
        );
    }
    println!(
        "  net: delivered_pkts={}, dropped_pkts={}",
        report.delivered_pkts, report.dropped_pkts
    );
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let spec = match &args.scenario {
        Some(path) => ScenarioSpec::load(path)?,
        None => args.to_spec(),
    };
    let report = run_scenario(&spec)?;
    print_summary(&report);

    if let Some(path) = &args.report_json {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("wrote report to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
