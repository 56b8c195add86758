//! 发送缓冲大小对吞吐的影响
//!
//! 链式拓扑 n0 -> n3，paced source 以 20Mbps 发送 1040 字节载荷，
//! 发送缓冲从 0 逐步增大到 33*1500 字节，每个取值独立跑一次仿真，
//! 记录 "缓冲(KB)\t吞吐(Kbps)"。

use clap::Parser;
use paced_sim::net::DataRate;
use paced_sim::scenario::{AppSpec, ScenarioReport, ScenarioSpec, TopologySpec, run_scenario};
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "buffer-sweep", about = "发送缓冲大小扫描：链式拓扑上的吞吐")]
struct Args {
    /// 缓冲步长（字节）
    #[arg(long, default_value_t = 1500)]
    step_bytes: u64,

    /// 最大缓冲 = max_steps * step_bytes
    #[arg(long, default_value_t = 33)]
    max_steps: u64,

    #[arg(long, default_value_t = 1040)]
    payload_bytes: u32,

    #[arg(long, default_value = "20Mbps")]
    rate: DataRate,

    #[arg(long, default_value_t = 1.0)]
    start_s: f64,

    #[arg(long, default_value_t = 10.0)]
    stop_s: f64,

    #[arg(long, default_value_t = 15.0)]
    until_s: f64,

    /// 瓶颈链路队列大小（包）
    #[arg(long)]
    queue_pkts: Option<u64>,

    /// 输出文件（每行：缓冲KB \t 吞吐Kbps）
    #[arg(long, default_value = "tput.plotme")]
    out: PathBuf,

    /// 最后一次运行的流统计 JSON
    #[arg(long)]
    flow_json: Option<PathBuf>,
}

fn spec_for(args: &Args, buf_bytes: u64) -> ScenarioSpec {
    let mut app = AppSpec::new(0, 3);
    app.payload_bytes = args.payload_bytes;
    app.rate = args.rate;
    app.start_s = args.start_s;
    app.stop_s = Some(args.stop_s);
    app.snd_buf_bytes = Some(buf_bytes);
    ScenarioSpec {
        topology: TopologySpec::Chain {
            access: None,
            bottleneck: None,
        },
        queue_pkts: args.queue_pkts,
        until_s: args.until_s,
        apps: vec![app],
    }
}

fn throughput_bps(report: &ScenarioReport) -> f64 {
    report
        .apps
        .first()
        .and_then(|a| report.app_flow(a.app))
        .and_then(|f| f.throughput_bps)
        .unwrap_or(0.0)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut lines = String::new();
    let mut last = None;
    for step in 0..=args.max_steps {
        let buf = step.saturating_mul(args.step_bytes);
        let report = run_scenario(&spec_for(&args, buf))?;
        let tput = throughput_bps(&report);
        info!(buf_bytes = buf, throughput_bps = tput, "sweep point");
        writeln!(lines, "{}\t{}", buf / 1000, tput / 1000.0)?;
        last = Some(report);
    }
    fs::write(&args.out, lines)?;
    eprintln!("wrote {}", args.out.display());

    if let (Some(path), Some(report)) = (&args.flow_json, last) {
        fs::write(path, serde_json::to_string_pretty(&report.flows)?)?;
        eprintln!("wrote flow stats to {}", path.display());
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
