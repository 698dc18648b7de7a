//! Precondition layer over the anchor service

use crate::api::{AnchorService, StoreError, StoreResult};
use crate::core::{rigid_inverse, translation, Anchor, AnchorId, BeaconFrame, BeaconId, Transform};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Control-thread snapshot of what the store needs to know about a beacon
#[derive(Debug, Clone, PartialEq)]
pub struct HostTarget {
    pub beacon: BeaconId,
    pub name: Option<String>,
    pub frame: Option<BeaconFrame>,
    /// Ranging completed this cycle
    pub done: bool,
}

/// Upload that passed every local check
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub beacon: BeaconId,
    pub beacon_name: String,
    pub relative_transform: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub beacon: BeaconId,
    pub beacon_name: String,
}

/// Shared handle to the anchor service.
///
/// The `prepare_*` checks are synchronous so they run on the control thread
/// and a failing precondition never reaches the network.
#[derive(Clone)]
pub struct AnchorStore {
    service: Arc<dyn AnchorService>,
}

impl AnchorStore {
    pub fn new(service: Arc<dyn AnchorService>) -> Self {
        Self { service }
    }

    pub fn prepare_upload(target: &HostTarget, world: &Transform) -> StoreResult<UploadRequest> {
        let beacon = target.beacon;
        if !target.done {
            return Err(StoreError::NotReadyToUpload { beacon });
        }
        let beacon_name = target
            .name
            .clone()
            .ok_or(StoreError::MissingBeaconName { beacon })?;
        let frame = target.frame.ok_or(StoreError::FrameUnknown { beacon })?;
        let inverse = rigid_inverse(&frame.transform()).ok_or(StoreError::FrameUnknown { beacon })?;

        Ok(UploadRequest {
            beacon,
            beacon_name,
            relative_transform: inverse * world,
        })
    }

    pub fn prepare_download(target: &HostTarget) -> StoreResult<DownloadRequest> {
        let beacon = target.beacon;
        let beacon_name = target
            .name
            .clone()
            .ok_or(StoreError::MissingBeaconName { beacon })?;
        Ok(DownloadRequest { beacon, beacon_name })
    }

    /// Send a checked upload; returns the id the service assigned
    pub async fn submit(&self, request: &UploadRequest) -> StoreResult<AnchorId> {
        let started = Instant::now();
        let result = self
            .service
            .create_anchor(&request.beacon_name, &request.relative_transform)
            .await;

        let offset = translation(&request.relative_transform);
        match &result {
            Ok(id) => info!(
                beacon = %request.beacon,
                anchor = %id,
                transform = ?(offset.x, offset.y, offset.z),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "anchor hosted"
            ),
            Err(e) => warn!(
                beacon = %request.beacon,
                transform = ?(offset.x, offset.y, offset.z),
                error = %e,
                "anchor upload failed"
            ),
        }
        result
    }

    /// Fetch every anchor hosted on a beacon, unresolved
    pub async fn fetch(&self, request: &DownloadRequest) -> StoreResult<Vec<Anchor>> {
        let started = Instant::now();
        let remote = match self.service.list_anchors(&request.beacon_name).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(beacon = %request.beacon, error = %e, "anchor download failed");
                return Err(e);
            }
        };

        info!(
            beacon = %request.beacon,
            count = remote.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "anchors downloaded"
        );
        Ok(remote
            .into_iter()
            .map(|r| Anchor {
                id: r.id,
                beacon: request.beacon,
                relative_transform: r.relative_transform,
                placement: None,
            })
            .collect())
    }

    pub async fn upload(&self, target: &HostTarget, world: &Transform) -> StoreResult<AnchorId> {
        let request = Self::prepare_upload(target, world)?;
        self.submit(&request).await
    }

    pub async fn download(&self, target: &HostTarget) -> StoreResult<Vec<Anchor>> {
        let request = Self::prepare_download(target)?;
        self.fetch(&request).await
    }
}
