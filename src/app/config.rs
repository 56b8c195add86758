//! Paced source 配置

use super::AppError;
use crate::net::DataRate;

/// 会话内最多发送多少个载荷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitLimit {
    Finite(u64),
    Unbounded,
}

impl UnitLimit {
    /// 已发送 `sent` 个之后是否还能继续发送
    pub fn allows_more(self, sent: u64) -> bool {
        match self {
            UnitLimit::Finite(n) => sent < n,
            UnitLimit::Unbounded => true,
        }
    }
}

impl From<Option<u64>> for UnitLimit {
    fn from(v: Option<u64>) -> Self {
        v.map_or(UnitLimit::Unbounded, UnitLimit::Finite)
    }
}

/// 每个载荷的大小
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSizing {
    Fixed(u32),
    /// 第 k 个载荷使用 `sizes[k % sizes.len()]`
    Cycle(Vec<u32>),
}

impl PayloadSizing {
    pub fn size_for(&self, k: u64) -> u32 {
        match self {
            PayloadSizing::Fixed(n) => *n,
            PayloadSizing::Cycle(sizes) if sizes.is_empty() => 0,
            PayloadSizing::Cycle(sizes) => sizes[(k % sizes.len() as u64) as usize],
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            PayloadSizing::Fixed(n) => *n > 0,
            PayloadSizing::Cycle(sizes) => !sizes.is_empty() && sizes.iter().all(|&n| n > 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacedConfig {
    pub payload: PayloadSizing,
    pub limit: UnitLimit,
    /// 目标平均速率
    pub rate: DataRate,
}

impl PacedConfig {
    pub fn new(payload_bytes: u32, limit: UnitLimit, rate: DataRate) -> Self {
        Self {
            payload: PayloadSizing::Fixed(payload_bytes),
            limit,
            rate,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !self.payload.is_valid() {
            return Err(AppError::InvalidConfiguration("payload size must be positive"));
        }
        if self.limit == UnitLimit::Finite(0) {
            return Err(AppError::InvalidConfiguration("unit limit must be at least 1"));
        }
        if self.rate.is_zero() {
            return Err(AppError::InvalidConfiguration("target rate must be positive"));
        }
        Ok(())
    }
}
