//! Anchor store errors

use crate::core::{BeaconId, ErrorClass};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Beacon has not finished ranging this cycle
    #[error("{beacon} has not finished ranging")]
    NotReadyToUpload { beacon: BeaconId },
    /// Beacon never advertised a name to key the anchors by
    #[error("{beacon} has no advertised name")]
    MissingBeaconName { beacon: BeaconId },
    /// No frame has been published for the beacon
    #[error("no frame published for {beacon}")]
    FrameUnknown { beacon: BeaconId },
    #[error("invalid service url: {url}")]
    BadUrl { url: String },
    #[error("anchor service answered {status}")]
    Http { status: u16 },
    #[error("malformed response body: {message}")]
    Decode { message: String },
    #[error("request failed: {message}")]
    Transport { message: String },
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::NotReadyToUpload { .. }
            | StoreError::MissingBeaconName { .. }
            | StoreError::FrameUnknown { .. } => ErrorClass::Precondition,
            StoreError::BadUrl { .. }
            | StoreError::Http { .. }
            | StoreError::Decode { .. }
            | StoreError::Transport { .. } => ErrorClass::Transport,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            StoreError::Decode { message: error.to_string() }
        } else if let Some(status) = error.status() {
            StoreError::Http { status: status.as_u16() }
        } else {
            StoreError::Transport { message: error.to_string() }
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Decode { message: error.to_string() }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
