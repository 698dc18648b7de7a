//! End-to-end runs of the control actor against the mock radio

use beacon_sync::core::translation;
use beacon_sync::runtime::{ControllerHandle, StatusReport};
use beacon_sync::{
    AnchorStore, BeaconId, Controller, InMemoryAnchorService, MockRadio, RangingRadio,
    RecordingTracker, SimulatedBeacon, SystemConfig,
};
use nalgebra::{Translation3, Vector3};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type TestController = Controller<MockRadio, RecordingTracker>;

struct Harness {
    handle: ControllerHandle,
    runner: JoinHandle<TestController>,
    service: Arc<InMemoryAnchorService>,
}

fn config() -> SystemConfig {
    let mut config = SystemConfig::default();
    config.radio.poll_interval_ms = 5;
    config
}

fn start(radio: MockRadio, service: Arc<InMemoryAnchorService>, config: SystemConfig) -> Harness {
    let (mut controller, handle) = Controller::new(
        &config,
        radio,
        RecordingTracker::new(),
        AnchorStore::new(service.clone()),
    );
    let runner = tokio::spawn(async move {
        controller.run().await;
        controller
    });
    Harness { handle, runner, service }
}

async fn wait_for(handle: &ControllerHandle, condition: impl Fn(&StatusReport) -> bool) -> StatusReport {
    for _ in 0..400 {
        let status = handle.status().await.unwrap();
        if condition(&status) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached: {:?}", handle.status().await.unwrap());
}

fn radio_with(beacons: &[(&str, i16, Vector3<f32>)]) -> MockRadio {
    let mut radio = MockRadio::simulated(20, Duration::from_secs(1), 0.0);
    for (name, rssi, position) in beacons {
        radio.add_beacon(SimulatedBeacon::new(name, *rssi, *position));
    }
    radio
}

#[tokio::test]
async fn test_strongest_beacon_ranged_first_then_next() {
    let radio = radio_with(&[
        ("B", -70, Vector3::new(0.0, 0.0, 4.0)),
        ("A", -40, Vector3::new(1.0, 0.0, 0.0)),
    ]);
    let h = start(radio, Arc::new(InMemoryAnchorService::new()), config());

    wait_for(&h.handle, |s| s.beacons == 2).await;
    h.handle.toggle_auto_scheduling().await.unwrap();
    let status = wait_for(&h.handle, |s| s.done == 2 && s.busy_beacon.is_none()).await;
    assert_eq!(status.frames, 2);

    h.handle.shutdown().await.unwrap();
    let controller = h.runner.await.unwrap();

    // Discovery order gives B id 1 and A id 2
    let registry = controller.coordinator().registry();
    let a = registry.get(BeaconId(2)).unwrap().peripheral;
    let b = registry.get(BeaconId(1)).unwrap().peripheral;
    assert_eq!(controller.coordinator().radio().connect_calls(), &[a, b]);
    assert!(controller.coordinator().radio().status().connected.is_none());
}

#[tokio::test]
async fn test_backlog_hosted_and_downloads_resolved() {
    let service = Arc::new(InMemoryAnchorService::new());
    service.seed("A", Translation3::new(0.0, 1.0, 0.0).to_homogeneous());

    let radio = radio_with(&[("A", -40, Vector3::new(1.0, 0.0, 0.0))]);
    let mut config = config();
    config.auto_scheduling = true;
    let h = start(radio, service, config);

    h.handle.place(Translation3::new(1.0, 0.0, 1.0).to_homogeneous()).await.unwrap();
    let status = wait_for(&h.handle, |s| s.done == 1 && s.backlog == 0 && s.network_tasks == 0).await;

    let summary = status.anchors.get(&BeaconId(1)).copied().unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.resolved, 2);
    assert_eq!(h.service.create_calls(), 1);
    assert_eq!(h.service.stored("A").len(), 2);

    h.handle.shutdown().await.unwrap();
    let controller = h.runner.await.unwrap();

    // The user's anchor plus the downloaded one, each placed once
    let placements = controller.tracker().placements();
    assert_eq!(placements.len(), 2);
    let placed_at = |x: f32, y: f32, z: f32| {
        placements
            .iter()
            .filter(|p| (translation(&p.transform) - Vector3::new(x, y, z)).norm() < 1e-5)
            .count()
    };
    assert_eq!(placed_at(1.0, 0.0, 1.0), 1);
    assert_eq!(placed_at(1.0, 1.0, 0.0), 1);
}

#[tokio::test]
async fn test_manual_session_does_not_allow_upload() {
    let radio = radio_with(&[("A", -40, Vector3::new(1.0, 0.0, 0.0))]);
    let h = start(radio, Arc::new(InMemoryAnchorService::new()), config());

    wait_for(&h.handle, |s| s.beacons == 1).await;
    h.handle.place(nalgebra::Matrix4::identity()).await.unwrap();
    h.handle.connect(BeaconId(1)).await.unwrap();

    let status = wait_for(&h.handle, |s| s.frames == 1 && s.busy_beacon.is_none()).await;
    assert_eq!(status.done, 0);
    assert_eq!(status.backlog, 1);
    assert_eq!(h.service.create_calls(), 0);

    // Auto-ranging the same beacon unlocks the upload
    h.handle.toggle_auto_scheduling().await.unwrap();
    wait_for(&h.handle, |s| s.done == 1 && s.backlog == 0 && s.network_tasks == 0).await;
    assert_eq!(h.service.create_calls(), 1);

    h.handle.shutdown().await.unwrap();
    h.runner.await.unwrap();
}

#[tokio::test]
async fn test_failed_upload_retried_on_next_placement() {
    let service = Arc::new(InMemoryAnchorService::new());
    let radio = radio_with(&[("A", -40, Vector3::new(1.0, 0.0, 0.0))]);
    let h = start(radio, service.clone(), config());

    wait_for(&h.handle, |s| s.beacons == 1 && s.network_tasks == 0).await;
    service.fail_next(1);
    h.handle.place(nalgebra::Matrix4::identity()).await.unwrap();
    h.handle.toggle_auto_scheduling().await.unwrap();

    // No internal retry: the anchor waits for the next trigger
    let status = wait_for(&h.handle, |s| s.done == 1 && s.network_tasks == 0).await;
    assert_eq!(status.backlog, 1);
    assert_eq!(service.create_calls(), 1);

    h.handle.place(Translation3::new(0.0, 0.0, 1.0).to_homogeneous()).await.unwrap();
    let status = wait_for(&h.handle, |s| s.backlog == 0 && s.network_tasks == 0).await;
    assert_eq!(status.anchors.get(&BeaconId(1)).map(|a| a.total), Some(2));
    assert_eq!(service.create_calls(), 3);

    h.handle.shutdown().await.unwrap();
    h.runner.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_returns_controller() {
    let radio = radio_with(&[]);
    let h = start(radio, Arc::new(InMemoryAnchorService::new()), config());
    h.handle.shutdown().await.unwrap();

    let controller = h.runner.await.unwrap();
    assert!(!controller.coordinator().radio().status().scanning);

    drop(controller);
    assert!(h.handle.status().await.is_err());
}
