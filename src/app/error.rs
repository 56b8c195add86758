use thiserror::Error;

use super::{AppId, AppState};
use crate::net::TransportError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("{app}: cannot {op} while {state:?}")]
    PreconditionViolation {
        app: AppId,
        op: &'static str,
        state: AppState,
    },
    #[error("unknown app {0}")]
    UnknownApp(AppId),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
