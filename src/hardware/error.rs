//! Radio link error types

use crate::core::{ErrorClass, PeripheralId};
use thiserror::Error;

/// Link-level failures reported by the ranging radio
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RadioError {
    /// Radio is off or not yet authorized
    #[error("radio is not powered on")]
    PoweredOff,
    /// Operation needs a connected peripheral
    #[error("peripheral {peripheral} is not connected")]
    NotConnected { peripheral: PeripheralId },
    /// Connection attempt rejected
    #[error("connection to {peripheral} failed: {reason}")]
    ConnectFailed { peripheral: PeripheralId, reason: String },
    /// Write to the control characteristic failed
    #[error("write to {peripheral} failed: {reason}")]
    WriteFailed { peripheral: PeripheralId, reason: String },
    /// Ranging subsystem refused the accessory configuration
    #[error("ranging subsystem error: {details}")]
    Ranging { details: String },
}

impl RadioError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Link
    }
}

/// Result type for radio operations
pub type RadioResult<T> = Result<T, RadioError>;
