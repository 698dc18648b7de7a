//! Backlog hosting and downloaded anchor resolution

use crate::api::{AnchorStore, DownloadRequest, StoreResult, UploadRequest};
use crate::core::{
    translation, Anchor, AnchorId, BacklogAnchor, BacklogId, BeaconFrame, BeaconId, Transform,
};
use crate::reconcile::FrameSource;
use crate::tracking::TrackingSession;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Upload handed to a network task; the result comes back with it
#[derive(Debug, Clone, PartialEq)]
pub struct UploadJob {
    pub backlog: BacklogId,
    pub request: UploadRequest,
}

/// Beacon frame closest to a world transform; ties keep the first one
pub fn nearest_beacon(world: &Transform, frames: &[(BeaconId, BeaconFrame)]) -> Option<(BeaconId, f32)> {
    let position = translation(world);
    frames
        .iter()
        .map(|(beacon, frame)| (*beacon, (frame.position - position).norm()))
        .fold(None, |best, (beacon, distance)| match best {
            Some((_, closest)) if !(distance < closest) => best,
            _ => Some((beacon, distance)),
        })
}

/// Local anchor bookkeeping for both reconciliation flows.
///
/// Mutated only on the control thread. Network work is described by the
/// returned jobs and requests; their results are applied back here.
#[derive(Debug)]
pub struct BacklogReconciler {
    anchor_name: String,
    next_backlog: u64,
    backlog: BTreeMap<BacklogId, BacklogAnchor>,
    in_flight: HashSet<BacklogId>,
    anchors: HashMap<BeaconId, Vec<Anchor>>,
    download_requested: HashSet<BeaconId>,
}

impl BacklogReconciler {
    /// `anchor_name` names every pose anchor placed in the tracking session
    pub fn new(anchor_name: impl Into<String>) -> Self {
        Self {
            anchor_name: anchor_name.into(),
            next_backlog: 0,
            backlog: BTreeMap::new(),
            in_flight: HashSet::new(),
            anchors: HashMap::new(),
            download_requested: HashSet::new(),
        }
    }

    pub fn anchor_name(&self) -> &str {
        &self.anchor_name
    }

    pub fn pending_count(&self) -> usize {
        self.backlog.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_pending(&self, id: BacklogId) -> bool {
        self.backlog.contains_key(&id)
    }

    pub fn backlog(&self) -> impl Iterator<Item = &BacklogAnchor> {
        self.backlog.values()
    }

    /// Anchors known for a beacon, hosted here or downloaded
    pub fn anchors(&self, beacon: BeaconId) -> &[Anchor] {
        self.anchors.get(&beacon).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Anchor count per beacon
    pub fn hosted_counts(&self) -> BTreeMap<BeaconId, usize> {
        self.anchors
            .iter()
            .map(|(beacon, anchors)| (*beacon, anchors.len()))
            .collect()
    }

    /// Place a user anchor in the session and queue it for hosting
    pub fn place<T: TrackingSession + ?Sized>(&mut self, tracker: &mut T, world: Transform) -> BacklogId {
        let placement = tracker.place_anchor(&self.anchor_name, &world);
        self.next_backlog += 1;
        let id = BacklogId(self.next_backlog);
        self.backlog.insert(
            id,
            BacklogAnchor {
                id,
                world_transform: world,
                placement,
            },
        );
        debug!(backlog = id.0, pending = self.backlog.len(), "anchor added to backlog");
        id
    }

    /// Host flow: pair each idle backlog anchor with its nearest beacon frame
    pub fn host_flow<S: FrameSource + ?Sized>(&mut self, source: &S) -> Vec<UploadJob> {
        let frames = source.published_frames();
        if frames.is_empty() {
            return Vec::new();
        }

        let mut jobs = Vec::new();
        for (id, anchor) in &self.backlog {
            if self.in_flight.contains(id) {
                continue;
            }
            let Some((beacon, distance)) = nearest_beacon(&anchor.world_transform, &frames) else {
                continue;
            };

            match AnchorStore::prepare_upload(&source.host_target(beacon), &anchor.world_transform) {
                Ok(request) => {
                    debug!(backlog = id.0, beacon = %beacon, distance, "hosting backlog anchor");
                    self.in_flight.insert(*id);
                    jobs.push(UploadJob { backlog: *id, request });
                }
                Err(e) => {
                    debug!(backlog = id.0, beacon = %beacon, error = %e, "backlog anchor stays pending");
                }
            }
        }
        jobs
    }

    /// Apply an upload completion; returns true when the anchor left the backlog
    pub fn apply_upload_result(&mut self, job: &UploadJob, result: StoreResult<AnchorId>) -> bool {
        self.in_flight.remove(&job.backlog);

        let id = match result {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    backlog = job.backlog.0,
                    beacon = %job.request.beacon,
                    error = %e,
                    retry = e.class().is_transient(),
                    "backlog anchor not hosted"
                );
                return false;
            }
        };

        let Some(hosted) = self.backlog.remove(&job.backlog) else {
            debug!(backlog = job.backlog.0, anchor = %id, "upload finished for an anchor no longer pending");
            return false;
        };

        // Already placed by the user, so resolve must not place it again
        let anchors = self.anchors.entry(job.request.beacon).or_default();
        match anchors.iter_mut().find(|a| a.id == id) {
            Some(existing) => {
                if existing.placement.is_none() {
                    existing.placement = Some(hosted.placement);
                }
            }
            None => anchors.push(Anchor {
                id,
                beacon: job.request.beacon,
                relative_transform: job.request.relative_transform,
                placement: Some(hosted.placement),
            }),
        }
        info!(backlog = job.backlog.0, anchor = %id, beacon = %job.request.beacon, "backlog anchor hosted");
        true
    }

    /// Download request for a beacon not fetched yet
    pub fn request_download<S: FrameSource + ?Sized>(
        &mut self,
        beacon: BeaconId,
        source: &S,
    ) -> Option<DownloadRequest> {
        if self.download_requested.contains(&beacon) {
            return None;
        }
        match AnchorStore::prepare_download(&source.host_target(beacon)) {
            Ok(request) => {
                self.download_requested.insert(beacon);
                Some(request)
            }
            Err(e) => {
                debug!(beacon = %beacon, error = %e, "cannot download anchors yet");
                None
            }
        }
    }

    /// Merge downloaded anchors by id and resolve what can be placed
    pub fn apply_download_result<S, T>(
        &mut self,
        beacon: BeaconId,
        result: StoreResult<Vec<Anchor>>,
        source: &S,
        tracker: &mut T,
    ) -> usize
    where
        S: FrameSource + ?Sized,
        T: TrackingSession + ?Sized,
    {
        let downloaded = match result {
            Ok(downloaded) => downloaded,
            Err(e) => {
                // Allow the next trigger to try again
                self.download_requested.remove(&beacon);
                warn!(beacon = %beacon, error = %e, "anchor download failed");
                return 0;
            }
        };

        let anchors = self.anchors.entry(beacon).or_default();
        for anchor in downloaded {
            if !anchors.iter().any(|a| a.id == anchor.id) {
                anchors.push(anchor);
            }
        }
        self.resolve(beacon, source, tracker)
    }

    /// Resolve flow for one beacon; returns how many anchors were placed
    pub fn resolve<S, T>(&mut self, beacon: BeaconId, source: &S, tracker: &mut T) -> usize
    where
        S: FrameSource + ?Sized,
        T: TrackingSession + ?Sized,
    {
        let target = source.host_target(beacon);
        if !target.done {
            return 0;
        }
        let Some(frame) = target.frame else {
            return 0;
        };
        let Some(anchors) = self.anchors.get_mut(&beacon) else {
            return 0;
        };

        let mut placed = 0;
        for anchor in anchors.iter_mut().filter(|a| !a.is_resolved()) {
            let world = frame.compose(&anchor.relative_transform);
            let handle = tracker.place_anchor(&self.anchor_name, &world);
            anchor.placement = Some(handle);
            placed += 1;

            let position = translation(&world);
            debug!(
                anchor = %anchor.id,
                beacon = %beacon,
                distance = anchor.distance_from_beacon(),
                transform = ?(position.x, position.y, position.z),
                "anchor resolved"
            );
        }
        if placed > 0 {
            info!(beacon = %beacon, placed, "resolved downloaded anchors");
        }
        placed
    }

    /// Resolve flow over every beacon with known anchors
    pub fn resolve_all<S, T>(&mut self, source: &S, tracker: &mut T) -> usize
    where
        S: FrameSource + ?Sized,
        T: TrackingSession + ?Sized,
    {
        let mut beacons: Vec<BeaconId> = self.anchors.keys().copied().collect();
        beacons.sort();
        beacons
            .into_iter()
            .map(|beacon| self.resolve(beacon, source, tracker))
            .sum()
    }
}
