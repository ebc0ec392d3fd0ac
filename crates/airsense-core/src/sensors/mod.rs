pub mod pms;

use thiserror_no_std::Error;

use crate::board::BoardError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: Not-initialized")]
    NotInitialized { sensor: &'static str },
    #[error("{sensor}: {reason}")]
    Unsupported {
        sensor: &'static str,
        reason: BoardError,
    },
    #[error("{sensor}: initialization failed ({details})")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: {operation} failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
}

pub use pms::{Pms5003t, PmsReadings};
