//! Messages into the control actor

use crate::api::StoreResult;
use crate::core::{Anchor, AnchorId, BeaconId, Transform};
use crate::hardware::RadioEvent;
use crate::reconcile::UploadJob;
use crate::runtime::StatusReport;
use crate::tracking::WorldMappingStatus;
use nalgebra::UnitQuaternion;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Everything the control actor reacts to
#[derive(Debug)]
pub enum ControlEvent {
    /// Event from a push-style radio backend
    Radio(RadioEvent),
    /// Absolute true heading in degrees
    Heading(f64),
    /// Camera orientation from the tracking session
    CameraPose(UnitQuaternion<f32>),
    WorldMapping(WorldMappingStatus),
    /// User placed an anchor at a local-frame transform
    Place(Transform),
    Connect(BeaconId),
    Disconnect(BeaconId),
    ToggleAutoScheduling,
    UploadFinished {
        job: UploadJob,
        result: StoreResult<AnchorId>,
    },
    DownloadFinished {
        beacon: BeaconId,
        result: StoreResult<Vec<Anchor>>,
    },
    Status(oneshot::Sender<StatusReport>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("control actor has stopped")]
pub struct ControllerClosed;

/// Cloneable sender side of the control queue
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    sender: mpsc::Sender<ControlEvent>,
}

impl ControllerHandle {
    pub(crate) fn new(sender: mpsc::Sender<ControlEvent>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: ControlEvent) -> Result<(), ControllerClosed> {
        self.sender.send(event).await.map_err(|_| ControllerClosed)
    }

    pub async fn place(&self, world: Transform) -> Result<(), ControllerClosed> {
        self.send(ControlEvent::Place(world)).await
    }

    pub async fn connect(&self, beacon: BeaconId) -> Result<(), ControllerClosed> {
        self.send(ControlEvent::Connect(beacon)).await
    }

    pub async fn disconnect(&self, beacon: BeaconId) -> Result<(), ControllerClosed> {
        self.send(ControlEvent::Disconnect(beacon)).await
    }

    pub async fn toggle_auto_scheduling(&self) -> Result<(), ControllerClosed> {
        self.send(ControlEvent::ToggleAutoScheduling).await
    }

    pub async fn heading(&self, degrees: f64) -> Result<(), ControllerClosed> {
        self.send(ControlEvent::Heading(degrees)).await
    }

    pub async fn camera_pose(&self, orientation: UnitQuaternion<f32>) -> Result<(), ControllerClosed> {
        self.send(ControlEvent::CameraPose(orientation)).await
    }

    /// Snapshot of the actor's state, taken between two events
    pub async fn status(&self) -> Result<StatusReport, ControllerClosed> {
        let (reply, response) = oneshot::channel();
        self.send(ControlEvent::Status(reply)).await?;
        response.await.map_err(|_| ControllerClosed)
    }

    pub async fn shutdown(&self) -> Result<(), ControllerClosed> {
        self.send(ControlEvent::Shutdown).await
    }
}
