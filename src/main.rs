use beacon_sync::{
    AnchorService, AnchorStore, ConfigurationManager, Controller, HttpAnchorService,
    InMemoryAnchorService, MockRadio, RecordingTracker, SimulatedBeacon, StatusReport,
    WorldMappingStatus,
};
use beacon_sync::runtime::ControlEvent;
use nalgebra::{Translation3, UnitQuaternion, Vector3};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Samples each simulated ranging session produces
const SAMPLES_PER_SESSION: usize = 24;
/// Simulated measurement noise (meters)
const SAMPLE_JITTER: f32 = 0.02;
/// Upper bound on how long the demo waits for the simulation to settle
const SETTLE_ROUNDS: usize = 100;

fn usage(program: &str) -> String {
    format!("Usage: {} [config.json] [--remote]", program)
}

/// Scripted radio with two beacons in the room
fn simulated_radio(config: &beacon_sync::RadioConfig) -> MockRadio {
    let mut radio = MockRadio::simulated(SAMPLES_PER_SESSION, Duration::from_secs(1), SAMPLE_JITTER)
        .with_config(config.clone());
    radio.add_beacon(SimulatedBeacon::new("lobby", -45, Vector3::new(1.0, 0.0, -2.0)));
    radio.add_beacon(SimulatedBeacon::new("stairs", -62, Vector3::new(-3.0, 0.5, 1.0)));
    radio
}

fn settled(status: &StatusReport) -> bool {
    status.busy_beacon.is_none() && status.network_tasks == 0 && status.backlog == 0 && status.done >= 2
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("beacon-sync", |s| s.as_str());

    let mut config_path = None;
    let mut remote = false;
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--remote" => remote = true,
            "-h" | "--help" => {
                println!("{}", usage(program));
                return Ok(());
            }
            path if config_path.is_none() => config_path = Some(path.to_string()),
            _ => {
                eprintln!("{}", usage(program));
                return Err("Invalid arguments".into());
            }
        }
    }

    let manager = match &config_path {
        Some(path) => ConfigurationManager::from_file(path)?,
        None => ConfigurationManager::new(),
    };
    let config = manager.get_system_config().clone();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    for warning in manager.validate_system_config(&config).warnings {
        tracing::warn!(%warning, "configuration");
    }

    let service: Arc<dyn AnchorService> = if remote {
        Arc::new(HttpAnchorService::new(&config.api_endpoint, config.request_timeout())?)
    } else {
        let memory = InMemoryAnchorService::new();
        // Another device already hosted something next to the lobby beacon
        memory.seed("lobby", Translation3::new(0.0, 0.0, 1.5).to_homogeneous());
        Arc::new(memory)
    };
    info!(remote, endpoint = %config.api_endpoint, "anchor service ready");

    let (mut controller, handle) = Controller::new(
        &config,
        simulated_radio(&config.radio),
        RecordingTracker::new(),
        AnchorStore::new(service),
    );
    let runner = tokio::spawn(async move {
        controller.run().await;
        controller
    });

    handle.send(ControlEvent::WorldMapping(WorldMappingStatus::Mapped)).await?;
    handle.heading(12.0).await?;
    let device = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -0.3);
    handle
        .camera_pose(device * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -std::f32::consts::FRAC_PI_2))
        .await?;
    handle.place(Translation3::new(0.5, 0.0, -1.0).to_homogeneous()).await?;
    if !config.auto_scheduling {
        handle.toggle_auto_scheduling().await?;
    }

    let mut status = handle.status().await?;
    for _ in 0..SETTLE_ROUNDS {
        if settled(&status) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        status = handle.status().await?;
    }

    handle.shutdown().await?;
    let controller = runner.await?;

    println!("{}", status);
    println!(
        "placed anchors: {} ({} resolved from beacons)",
        controller.tracker().placements().len(),
        status.resolved_anchors()
    );
    Ok(())
}
