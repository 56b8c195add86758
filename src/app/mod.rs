//! 应用层
//!
//! 以恒定平均比特率、自调度方式发包的应用（paced source），
//! 以及管理多个应用的应用栈和驱动其生命周期的事件。

mod config;
mod error;
mod events;
mod paced;
mod stack;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use config::{PacedConfig, PayloadSizing, UnitLimit};
pub use error::AppError;
pub use events::{AppChangeRate, AppHost, AppSend, AppStart, AppStop, install, send_tick};
pub use paced::{AppCtx, AppState, PacedSource, TickFn};
pub use stack::AppStack;

/// 应用标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppId(pub u64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app{}", self.0)
    }
}
