#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the gantry build core
//!
//! This crate provides the error types shared across the operation executor
//! and the output pipeline. All error types implement Clone so a failure can
//! be carried in an operation finish event while the original propagates to
//! the caller.

use thiserror::Error;

pub mod operations;

pub use operations::OperationError;

/// Platform line separator, used when joining multi-cause failure messages.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
/// Platform line separator, used when joining multi-cause failure messages.
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("{0}")]
    Operations(#[from] OperationError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_message() {
        let error = Error::internal("boom");
        assert_eq!(error.to_string(), "internal error: boom");
    }

    #[test]
    fn operation_error_converts() {
        let error: Error = OperationError::NoCurrentOperation.into();
        assert!(matches!(error, Error::Operations(_)));
    }
}
