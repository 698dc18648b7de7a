//! Core data types for beacon discovery, ranging, and anchors

use crate::core::transform::{from_pose, translation, Transform};
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Stable identifier assigned by the registry on first discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeaconId(pub u32);

impl fmt::Display for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "beacon#{}", self.0)
    }
}

/// Opaque handle the radio uses for a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeripheralId(pub Uuid);

impl PeripheralId {
    pub fn random() -> Self {
        PeripheralId(Uuid::new_v4())
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend-assigned anchor identity
pub type AnchorId = Uuid;

/// Identity of a locally placed anchor awaiting upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BacklogId(pub u64);

/// Handle of a named pose anchor placed in the tracking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlacementHandle(pub u64);

/// Last discovery sighting of a beacon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanSnapshot {
    pub timestamp: Instant,
    /// Received signal strength (dBm)
    pub rssi: i16,
}

/// Measured location of the beacon relative to the device
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NearbyLocation {
    /// Distance to the beacon (meters)
    pub distance: Option<f32>,
    /// Unit direction towards the beacon in device coordinates
    pub direction: Option<Vector3<f32>>,
    /// Horizontal angle towards the beacon (radians)
    pub horizontal_angle: Option<f32>,
}

/// One sample produced by a ranging session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangingSample {
    pub timestamp: Instant,
    pub location: Option<NearbyLocation>,
    /// Beacon position resolved in the local tracking frame
    pub world_position: Option<Vector3<f32>>,
}

/// A discovered beacon and its latest observations
#[derive(Debug, Clone)]
pub struct Beacon {
    pub id: BeaconId,
    pub peripheral: PeripheralId,
    pub name: Option<String>,
    pub last_scan: Option<ScanSnapshot>,
    pub last_ranging: Option<RangingSample>,
}

impl Beacon {
    pub fn new(id: BeaconId, peripheral: PeripheralId, name: Option<String>) -> Self {
        Self {
            id,
            peripheral,
            name,
            last_scan: None,
            last_ranging: None,
        }
    }

    /// Name shown to users, falling back to the generated id
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    /// True when the beacon has not been sighted within `window` of `now`
    pub fn is_stale(&self, now: Instant, window: Duration) -> bool {
        match self.last_scan {
            Some(scan) => now.saturating_duration_since(scan.timestamp) >= window,
            None => true,
        }
    }
}

/// Pose of a beacon in the local tracking frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeaconFrame {
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
}

impl BeaconFrame {
    pub fn new(position: Vector3<f32>, orientation: UnitQuaternion<f32>) -> Self {
        Self { position, orientation }
    }

    pub fn transform(&self) -> Transform {
        from_pose(&self.position, &self.orientation)
    }

    /// Local-frame pose of something expressed relative to this frame
    pub fn compose(&self, relative: &Transform) -> Transform {
        self.transform() * relative
    }
}

/// Anchor persisted on the backend relative to a beacon frame
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: AnchorId,
    pub beacon: BeaconId,
    pub relative_transform: Transform,
    /// Set once the anchor has been placed in the tracking session
    pub placement: Option<PlacementHandle>,
}

impl Anchor {
    pub fn is_resolved(&self) -> bool {
        self.placement.is_some()
    }

    /// Distance of the anchor from its beacon's origin
    pub fn distance_from_beacon(&self) -> f32 {
        translation(&self.relative_transform).norm()
    }
}

/// Locally placed anchor not yet confirmed by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct BacklogAnchor {
    pub id: BacklogId,
    pub world_transform: Transform,
    pub placement: PlacementHandle,
}
