//! Control actor dispatch loop

use crate::algorithms::{device_orientation_from_camera, HeadingAligner};
use crate::api::{AnchorStore, DownloadRequest};
use crate::core::{BeaconId, ErrorClass};
use crate::hardware::{RadioEvent, RangingRadio};
use crate::reconcile::{BacklogReconciler, UploadJob};
use crate::ranging::{CoordinatorEvent, RangingCoordinator, RangingError};
use crate::runtime::{AnchorSummary, ControlEvent, ControllerHandle, StatusReport};
use crate::tracking::{TrackingSession, WorldMappingStatus};
use crate::utils::SystemConfig;
use nalgebra::UnitQuaternion;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Capacity of the control queue
const QUEUE_CAPACITY: usize = 256;
/// Radio events handled per poll before the queue gets a turn
const MAX_RADIO_EVENTS_PER_POLL: usize = 64;

/// Owner of all per-device state, driven by [`ControlEvent`]s
pub struct Controller<R: RangingRadio, T: TrackingSession> {
    coordinator: RangingCoordinator<R>,
    reconciler: BacklogReconciler,
    tracker: T,
    store: AnchorStore,
    aligner: HeadingAligner,
    heading: Option<f64>,
    world_mapping: WorldMappingStatus,
    poll_interval: Duration,
    network_tasks: usize,
    sender: mpsc::Sender<ControlEvent>,
    receiver: mpsc::Receiver<ControlEvent>,
}

impl<R, T> Controller<R, T>
where
    R: RangingRadio + 'static,
    T: TrackingSession + 'static,
{
    pub fn new(config: &SystemConfig, radio: R, tracker: T, store: AnchorStore) -> (Self, ControllerHandle) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let mut coordinator = RangingCoordinator::new(radio, config.ranging_parameters());
        if config.auto_scheduling {
            coordinator.toggle_auto_scheduling(Instant::now());
        }

        let controller = Self {
            coordinator,
            reconciler: BacklogReconciler::new(config.anchor_name.clone()),
            tracker,
            store,
            aligner: HeadingAligner::new(config.tilt_limit),
            heading: None,
            world_mapping: WorldMappingStatus::default(),
            poll_interval: config.poll_interval().max(Duration::from_millis(1)),
            network_tasks: 0,
            sender: sender.clone(),
            receiver,
        };
        (controller, ControllerHandle::new(sender))
    }

    pub fn coordinator(&self) -> &RangingCoordinator<R> {
        &self.coordinator
    }

    pub fn reconciler(&self) -> &BacklogReconciler {
        &self.reconciler
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Process events until shutdown.
    ///
    /// Discovery starts on entry. Between queue messages the radio is polled
    /// at the configured interval and after every message.
    pub async fn run(&mut self) {
        if let Err(e) = self.coordinator.radio_mut().start_discovery() {
            error!(error = %e, "cannot start discovery");
        }
        info!(
            auto_scheduling = self.coordinator.auto_scheduling(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "control loop started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = self.receiver.recv() => match event {
                    Some(ControlEvent::Shutdown) | None => break,
                    Some(event) => self.handle(event),
                },
                _ = ticker.tick() => {}
            }
            self.poll_radio();
        }

        self.coordinator.radio_mut().stop_discovery();
        info!(network_tasks = self.network_tasks, "control loop stopped");
    }

    /// Apply one event
    pub fn handle(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Radio(event) => self.dispatch_radio(event),
            ControlEvent::Heading(degrees) => {
                self.heading = Some(degrees);
            }
            ControlEvent::CameraPose(camera) => self.update_alignment(&camera),
            ControlEvent::WorldMapping(status) => {
                if status != self.world_mapping {
                    debug!(status = %status, "world mapping status changed");
                }
                self.world_mapping = status;
            }
            ControlEvent::Place(world) => {
                self.reconciler.place(&mut self.tracker, world);
                self.host_backlog();
            }
            ControlEvent::Connect(beacon) => {
                if let Err(e) = self.coordinator.connect(beacon, Instant::now()) {
                    self.log_ranging_error(&e);
                }
                self.process_coordinator_events();
            }
            ControlEvent::Disconnect(beacon) => {
                self.coordinator.disconnect(beacon, Instant::now());
                self.process_coordinator_events();
            }
            ControlEvent::ToggleAutoScheduling => {
                self.coordinator.toggle_auto_scheduling(Instant::now());
                self.process_coordinator_events();
            }
            ControlEvent::UploadFinished { job, result } => {
                self.network_tasks = self.network_tasks.saturating_sub(1);
                self.reconciler.apply_upload_result(&job, result);
            }
            ControlEvent::DownloadFinished { beacon, result } => {
                self.network_tasks = self.network_tasks.saturating_sub(1);
                self.reconciler
                    .apply_download_result(beacon, result, &self.coordinator, &mut self.tracker);
            }
            ControlEvent::Status(reply) => {
                // Requester may have given up
                let _ = reply.send(self.status());
            }
            ControlEvent::Shutdown => {}
        }
    }

    /// Drain pending radio events
    pub fn poll_radio(&mut self) {
        for _ in 0..MAX_RADIO_EVENTS_PER_POLL {
            match self.coordinator.radio_mut().read_event() {
                Ok(Some(event)) => self.dispatch_radio(event),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "radio read failed");
                    break;
                }
            }
        }
    }

    pub fn status(&self) -> StatusReport {
        let mut anchors = BTreeMap::new();
        for beacon in self.reconciler.hosted_counts().into_keys() {
            let known = self.reconciler.anchors(beacon);
            anchors.insert(
                beacon,
                AnchorSummary {
                    total: known.len(),
                    resolved: known.iter().filter(|a| a.is_resolved()).count(),
                    farthest: known
                        .iter()
                        .map(|a| a.distance_from_beacon())
                        .fold(0.0, f32::max),
                },
            );
        }

        StatusReport {
            busy_beacon: self.coordinator.busy_beacon(),
            auto_scheduling: self.coordinator.auto_scheduling(),
            beacons: self.coordinator.registry().len(),
            done: self.coordinator.done_count(),
            frames: self.coordinator.frames().len(),
            aligned: self.coordinator.alignment().is_some(),
            backlog: self.reconciler.pending_count(),
            uploads_in_flight: self.reconciler.in_flight_count(),
            network_tasks: self.network_tasks,
            anchors,
            world_mapping: self.world_mapping,
            radio: self.coordinator.radio().status(),
        }
    }

    fn dispatch_radio(&mut self, event: RadioEvent) {
        let peripheral = event.peripheral();
        if let Err(e) = self.coordinator.handle_radio_event(event, Instant::now()) {
            debug!(peripheral = %peripheral, "radio event rejected");
            self.log_ranging_error(&e);
        }
        self.process_coordinator_events();
    }

    fn update_alignment(&mut self, camera: &UnitQuaternion<f32>) {
        let device = device_orientation_from_camera(camera);
        if let Some(alignment) = self.aligner.align(self.heading, &device) {
            self.coordinator.set_alignment(alignment);
        }
    }

    fn log_ranging_error(&self, e: &RangingError) {
        match e.class() {
            ErrorClass::Protocol => error!(error = %e, "accessory protocol mismatch"),
            class => warn!(error = %e, class = ?class, "ranging failure"),
        }
    }

    /// React to what the coordinator published since the last call
    fn process_coordinator_events(&mut self) {
        for event in self.coordinator.drain_events() {
            match event {
                CoordinatorEvent::BeaconDiscovered { beacon } => {
                    info!(beacon = %beacon, "new beacon discovered");
                    self.start_download(beacon);
                }
                CoordinatorEvent::RangingCompleted { beacon } => {
                    self.start_download(beacon);
                    self.reconciler
                        .resolve(beacon, &self.coordinator, &mut self.tracker);
                    self.host_backlog();
                }
                CoordinatorEvent::FramePublished { beacon, frame } => {
                    debug!(
                        beacon = %beacon,
                        position = ?(frame.position.x, frame.position.y, frame.position.z),
                        "frame published"
                    );
                }
                CoordinatorEvent::SessionStarted { .. }
                | CoordinatorEvent::SampleRecorded { .. }
                | CoordinatorEvent::SessionEnded { .. } => {}
            }
        }
    }

    fn start_download(&mut self, beacon: BeaconId) {
        if let Some(request) = self.reconciler.request_download(beacon, &self.coordinator) {
            self.spawn_download(request);
        }
    }

    fn host_backlog(&mut self) {
        for job in self.reconciler.host_flow(&self.coordinator) {
            self.spawn_upload(job);
        }
    }

    fn spawn_upload(&mut self, job: UploadJob) {
        self.network_tasks += 1;
        let store = self.store.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = store.submit(&job.request).await;
            if sender.send(ControlEvent::UploadFinished { job, result }).await.is_err() {
                debug!("control loop gone, dropping upload result");
            }
        });
    }

    fn spawn_download(&mut self, request: DownloadRequest) {
        self.network_tasks += 1;
        let store = self.store.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = store.fetch(&request).await;
            let event = ControlEvent::DownloadFinished {
                beacon: request.beacon,
                result,
            };
            if sender.send(event).await.is_err() {
                debug!("control loop gone, dropping download result");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryAnchorService;
    use crate::core::PeripheralId;
    use crate::hardware::{DiscoveryEvent, MockRadio};
    use crate::tracking::RecordingTracker;
    use nalgebra::Vector3;
    use std::sync::Arc;

    fn controller() -> (Controller<MockRadio, RecordingTracker>, ControllerHandle) {
        let store = AnchorStore::new(Arc::new(InMemoryAnchorService::new()));
        Controller::new(&SystemConfig::default(), MockRadio::new(), RecordingTracker::new(), store)
    }

    #[tokio::test]
    async fn test_status_reflects_backlog() {
        let (mut controller, _handle) = controller();
        controller.handle(ControlEvent::Place(nalgebra::Matrix4::identity()));

        let status = controller.status();
        assert_eq!(status.backlog, 1);
        assert_eq!(status.network_tasks, 0);
        assert!(status.busy_beacon.is_none());
        assert_eq!(controller.tracker().placements().len(), 1);
    }

    #[tokio::test]
    async fn test_discovery_spawns_download() {
        let (mut controller, _handle) = controller();
        let event = DiscoveryEvent::new(PeripheralId::random(), Some("B1".to_string()), -50);
        controller.handle(ControlEvent::Radio(RadioEvent::Discovery(event)));

        assert_eq!(controller.status().beacons, 1);
        assert_eq!(controller.status().network_tasks, 1);
    }

    #[tokio::test]
    async fn test_alignment_needs_heading() {
        let (mut controller, _handle) = controller();
        // Device leaning back a little, well inside the tilt envelope
        let device = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -0.5);
        let camera = device * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -std::f32::consts::FRAC_PI_2);

        controller.handle(ControlEvent::CameraPose(camera));
        assert!(!controller.status().aligned);

        controller.handle(ControlEvent::Heading(90.0));
        controller.handle(ControlEvent::CameraPose(camera));
        assert!(controller.status().aligned);
    }

    #[tokio::test]
    async fn test_toggle_through_queue() {
        let (mut controller, handle) = controller();
        let runner = tokio::spawn(async move {
            controller.run().await;
            controller
        });

        handle.toggle_auto_scheduling().await.unwrap();
        assert!(handle.status().await.unwrap().auto_scheduling);
        handle.shutdown().await.unwrap();

        let controller = runner.await.unwrap();
        assert!(controller.coordinator().auto_scheduling());
    }
}
