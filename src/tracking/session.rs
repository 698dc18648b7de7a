//! Tracking session interface

use crate::core::{PlacementHandle, Transform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality of the tracking session's map of the surroundings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorldMappingStatus {
    #[default]
    NotAvailable,
    Limited,
    Extending,
    Mapped,
}

impl fmt::Display for WorldMappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorldMappingStatus::NotAvailable => "not available",
            WorldMappingStatus::Limited => "limited",
            WorldMappingStatus::Extending => "extending",
            WorldMappingStatus::Mapped => "mapped",
        };
        f.write_str(label)
    }
}

/// A named pose anchor living in the tracking session
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub handle: PlacementHandle,
    pub name: String,
    pub transform: Transform,
}

/// Placement side of the tracking subsystem.
///
/// Called from the control thread only.
pub trait TrackingSession: Send {
    /// Place a named pose anchor at a local-frame transform
    fn place_anchor(&mut self, name: &str, transform: &Transform) -> PlacementHandle;

    /// Remove a previously placed anchor; unknown handles are ignored
    fn remove_anchor(&mut self, handle: PlacementHandle);
}
