//! Single-flight scheduling over arbitrary discovery sequences

use beacon_sync::core::PeripheralId;
use beacon_sync::hardware::{DiscoveryEvent, LinkEvent, RadioEvent};
use beacon_sync::{CoordinatorEvent, MockRadio, RangingCoordinator, RangingParameters};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Replays coordinator publications and checks sessions never overlap
#[derive(Default)]
struct SessionTracker {
    active: Option<beacon_sync::BeaconId>,
    started: usize,
}

impl SessionTracker {
    fn observe(&mut self, events: Vec<CoordinatorEvent>) {
        for event in events {
            match event {
                CoordinatorEvent::SessionStarted { beacon } => {
                    assert!(self.active.is_none(), "{} started while {:?} busy", beacon, self.active);
                    self.active = Some(beacon);
                    self.started += 1;
                }
                CoordinatorEvent::SessionEnded { beacon, .. } => {
                    assert_eq!(self.active, Some(beacon));
                    self.active = None;
                }
                _ => {}
            }
        }
    }
}

#[test]
fn test_random_discovery_sequences_stay_single_flight() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..50 {
        let mut coordinator = RangingCoordinator::new(MockRadio::new(), RangingParameters::default());
        let mut sessions = SessionTracker::default();
        let start = Instant::now();
        let peripherals: Vec<PeripheralId> = (0..rng.gen_range(1..8)).map(|_| PeripheralId::random()).collect();

        if rng.gen_bool(0.5) {
            coordinator.toggle_auto_scheduling(start);
        }

        for step in 0..40u64 {
            let now = start + Duration::from_millis(step * 250);
            let peripheral = peripherals[rng.gen_range(0..peripherals.len())];

            match rng.gen_range(0..10) {
                0 => coordinator.toggle_auto_scheduling(now),
                1 => {
                    let beacon = coordinator.registry().lookup(peripheral);
                    if let Some(beacon) = beacon {
                        let _ = coordinator.connect(beacon, now);
                    }
                }
                2 => {
                    let event = RadioEvent::Link(LinkEvent::ConnectFailed {
                        peripheral,
                        reason: "out of range".to_string(),
                    });
                    let _ = coordinator.handle_radio_event(event, now);
                }
                3 => {
                    let _ = coordinator.handle_radio_event(RadioEvent::Link(LinkEvent::Disconnected { peripheral }), now);
                }
                _ => {
                    let event = DiscoveryEvent::new(peripheral, None, rng.gen_range(-95..-30)).at(now);
                    let _ = coordinator.handle_radio_event(RadioEvent::Discovery(event), now);
                }
            }

            sessions.observe(coordinator.drain_events());
            assert_eq!(sessions.active, coordinator.busy_beacon());
        }
    }
}

#[test]
fn test_strongest_eligible_beacon_selected() {
    let mut coordinator = RangingCoordinator::new(MockRadio::new(), RangingParameters::default());
    let now = Instant::now();
    let weak = PeripheralId::random();
    let strong = PeripheralId::random();

    for (peripheral, rssi) in [(weak, -70), (strong, -40)] {
        let event = DiscoveryEvent::new(peripheral, Some("beacon".to_string()), rssi).at(now);
        coordinator.handle_radio_event(RadioEvent::Discovery(event), now).unwrap();
    }
    coordinator.toggle_auto_scheduling(now);

    assert_eq!(coordinator.busy_beacon(), coordinator.registry().lookup(strong));
}

#[test]
fn test_stale_beacon_not_selected() {
    let mut coordinator = RangingCoordinator::new(MockRadio::new(), RangingParameters::default());
    let seen = Instant::now();
    let peripheral = PeripheralId::random();

    let event = DiscoveryEvent::new(peripheral, None, -40).at(seen);
    coordinator.handle_radio_event(RadioEvent::Discovery(event), seen).unwrap();

    coordinator.toggle_auto_scheduling(seen + Duration::from_secs(31));
    assert!(coordinator.busy_beacon().is_none());
}
