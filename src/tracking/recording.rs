//! Tracking session stand-in that records placements

use crate::core::{PlacementHandle, Transform};
use crate::tracking::{Placement, TrackingSession};
use tracing::debug;

#[derive(Debug, Default)]
pub struct RecordingTracker {
    next_handle: u64,
    placements: Vec<Placement>,
    removed: Vec<PlacementHandle>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors currently placed, in placement order
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn removed(&self) -> &[PlacementHandle] {
        &self.removed
    }

    pub fn placement(&self, handle: PlacementHandle) -> Option<&Placement> {
        self.placements.iter().find(|p| p.handle == handle)
    }
}

impl TrackingSession for RecordingTracker {
    fn place_anchor(&mut self, name: &str, transform: &Transform) -> PlacementHandle {
        self.next_handle += 1;
        let handle = PlacementHandle(self.next_handle);
        debug!(handle = handle.0, name, "placing anchor");
        self.placements.push(Placement {
            handle,
            name: name.to_string(),
            transform: *transform,
        });
        handle
    }

    fn remove_anchor(&mut self, handle: PlacementHandle) {
        let before = self.placements.len();
        self.placements.retain(|p| p.handle != handle);
        if self.placements.len() != before {
            self.removed.push(handle);
        }
    }
}
