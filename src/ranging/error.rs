//! Ranging coordinator errors

use crate::core::{BeaconId, ErrorClass, PeripheralId};
use crate::hardware::{ProtocolError, RadioError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangingError {
    #[error("unknown beacon {0}")]
    UnknownBeacon(BeaconId),
    #[error(transparent)]
    Radio(#[from] RadioError),
    /// Peer firmware speaks a protocol we do not understand
    #[error("protocol mismatch with {peripheral}: {source}")]
    Protocol {
        peripheral: PeripheralId,
        #[source]
        source: ProtocolError,
    },
}

impl RangingError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RangingError::UnknownBeacon(_) => ErrorClass::Precondition,
            RangingError::Radio(error) => error.class(),
            RangingError::Protocol { .. } => ErrorClass::Protocol,
        }
    }
}

pub type RangingResult<T> = Result<T, RangingError>;
