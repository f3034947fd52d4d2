//! Console error types

use thiserror::Error;

use crate::device::DeviceError;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("No console output handle is available")]
    NoHandle,

    #[error("Console title must not be empty")]
    EmptyTitle,

    #[error("Failed to {op}: {source}")]
    Device {
        op: &'static str,
        #[source]
        source: DeviceError,
    },
}

impl ConsoleError {
    /// Adapter for `map_err` naming the failed step
    pub(crate) fn device(op: &'static str) -> impl FnOnce(DeviceError) -> ConsoleError {
        move |source| ConsoleError::Device { op, source }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
