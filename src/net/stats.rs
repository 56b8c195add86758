//! 统计信息
//!
//! 网络级汇总统计与按流统计（类似 flow monitor）。

use std::collections::BTreeMap;

use serde::Serialize;

use crate::sim::SimTime;

/// 单个流的统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowStats {
    pub tx_pkts: u64,
    pub tx_bytes: u64,
    pub rx_pkts: u64,
    pub rx_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    pub first_tx: Option<SimTime>,
    pub last_tx: Option<SimTime>,
    pub first_rx: Option<SimTime>,
    pub last_rx: Option<SimTime>,
}

impl FlowStats {
    pub(crate) fn on_tx(&mut self, now: SimTime, bytes: u32) {
        self.tx_pkts += 1;
        self.tx_bytes += bytes as u64;
        self.first_tx.get_or_insert(now);
        self.last_tx = Some(now);
    }

    pub(crate) fn on_rx(&mut self, now: SimTime, bytes: u32) {
        self.rx_pkts += 1;
        self.rx_bytes += bytes as u64;
        self.first_rx.get_or_insert(now);
        self.last_rx = Some(now);
    }

    pub(crate) fn on_drop(&mut self, bytes: u32) {
        self.dropped_pkts += 1;
        self.dropped_bytes += bytes as u64;
    }

    /// 接收吞吐（bit/s）：rx_bytes*8 / (最后一次接收 - 第一次发送)。
    ///
    /// 没有收到数据或时间区间为 0 时返回 None。
    pub fn throughput_bps(&self) -> Option<f64> {
        let (first_tx, last_rx) = (self.first_tx?, self.last_rx?);
        let span = last_rx.saturating_sub(first_tx);
        if span == SimTime::ZERO {
            return None;
        }
        Some(self.rx_bytes as f64 * 8.0 / span.as_secs_f64())
    }
}

/// 网络统计信息
#[derive(Debug, Default)]
pub struct Stats {
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    pub flows: BTreeMap<u64, FlowStats>,
}

impl Stats {
    pub fn flow(&self, flow_id: u64) -> Option<&FlowStats> {
        self.flows.get(&flow_id)
    }

    pub(crate) fn flow_mut(&mut self, flow_id: u64) -> &mut FlowStats {
        self.flows.entry(flow_id).or_default()
    }
}
