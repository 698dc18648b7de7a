//! What the reconciler reads from the ranging side

use crate::api::HostTarget;
use crate::core::{BeaconFrame, BeaconId};
use crate::hardware::RangingRadio;
use crate::ranging::RangingCoordinator;

/// Read-only view of published beacon frames and ranging progress
pub trait FrameSource {
    /// Every published frame, ordered by beacon id
    fn published_frames(&self) -> Vec<(BeaconId, BeaconFrame)>;

    /// Snapshot used for the anchor store preconditions
    fn host_target(&self, beacon: BeaconId) -> HostTarget;
}

impl<R: RangingRadio> FrameSource for RangingCoordinator<R> {
    fn published_frames(&self) -> Vec<(BeaconId, BeaconFrame)> {
        let mut frames: Vec<_> = self
            .frames()
            .iter()
            .map(|(beacon, frame)| (*beacon, *frame))
            .collect();
        frames.sort_by_key(|(beacon, _)| *beacon);
        frames
    }

    fn host_target(&self, beacon: BeaconId) -> HostTarget {
        HostTarget {
            beacon,
            name: self.registry().get(beacon).and_then(|b| b.name.clone()),
            frame: self.frame(beacon).copied(),
            done: self.is_done(beacon),
        }
    }
}
