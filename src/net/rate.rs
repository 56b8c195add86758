//! 数据速率
//!
//! 以 bit/s 表示的速率，支持 "20Mbps"、"512kb/s" 这类写法。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::SimTime;

/// 数据速率（bit/s）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataRate(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateParseError {
    #[error("empty data rate")]
    Empty,
    #[error("invalid number in data rate {0:?}")]
    BadNumber(String),
    #[error("unknown data rate unit {0:?}")]
    BadUnit(String),
}

impl DataRate {
    pub const ZERO: DataRate = DataRate(0);

    pub const fn from_bps(bps: u64) -> Self {
        DataRate(bps)
    }

    pub const fn from_kbps(kbps: u64) -> Self {
        DataRate(kbps.saturating_mul(1_000))
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        DataRate(mbps.saturating_mul(1_000_000))
    }

    pub const fn from_gbps(gbps: u64) -> Self {
        DataRate(gbps.saturating_mul(1_000_000_000))
    }

    pub const fn bps(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// 以该速率发送 `bytes` 字节所需时间：ceil(bytes*8 / bps) 秒，精确到纳秒。
    pub fn tx_time(self, bytes: u32) -> SimTime {
        if self.0 == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128) + (self.0 as u128 - 1)) / self.0 as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }
}

impl FromStr for DataRate {
    type Err = RateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RateParseError::Empty);
        }
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .parse()
            .map_err(|_| RateParseError::BadNumber(s.to_string()))?;

        let unit = unit.trim().to_ascii_lowercase();
        let prefix = unit
            .strip_suffix("bps")
            .or_else(|| unit.strip_suffix("b/s"))
            .ok_or_else(|| RateParseError::BadUnit(unit.clone()))?;
        let mult = match prefix {
            "" => 1.0,
            "k" => 1e3,
            "m" => 1e6,
            "g" => 1e9,
            _ => return Err(RateParseError::BadUnit(unit)),
        };
        Ok(DataRate((value * mult).round() as u64))
    }
}

impl TryFrom<String> for DataRate {
    type Error = RateParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DataRate> for String {
    fn from(r: DataRate) -> String {
        r.to_string()
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bps = self.0;
        if bps != 0 && bps % 1_000_000_000 == 0 {
            write!(f, "{}Gbps", bps / 1_000_000_000)
        } else if bps != 0 && bps % 1_000_000 == 0 {
            write!(f, "{}Mbps", bps / 1_000_000)
        } else if bps != 0 && bps % 1_000 == 0 {
            write!(f, "{}Kbps", bps / 1_000)
        } else {
            write!(f, "{bps}bps")
        }
    }
}
