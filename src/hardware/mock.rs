//! Mock ranging radio for testing and simulation

use crate::core::{NearbyLocation, PeripheralId, RangingSample};
use crate::hardware::{
    DiscoveryEvent, LinkEvent, MessageId, RadioConfig, RadioError, RadioEvent, RadioResult,
    RadioStatus, RangingEvent, RangingRadio,
};
use nalgebra::Vector3;
use rand::Rng;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Accessory configuration the simulated beacons hand out
const ACCESSORY_CONFIGURATION: &[u8] = b"mock-accessory-configuration";
/// Shareable configuration the simulated ranging subsystem produces
const SHAREABLE_CONFIGURATION: &[u8] = b"mock-shareable-configuration";

/// A beacon the mock radio pretends to see
#[derive(Debug, Clone)]
pub struct SimulatedBeacon {
    pub peripheral: PeripheralId,
    pub name: Option<String>,
    pub rssi: i16,
    /// True position in the local tracking frame
    pub position: Vector3<f32>,
    /// Unreachable beacons advertise but refuse connections
    pub reachable: bool,
}

impl SimulatedBeacon {
    pub fn new(name: &str, rssi: i16, position: Vector3<f32>) -> Self {
        Self {
            peripheral: PeripheralId::random(),
            name: Some(name.to_string()),
            rssi,
            position,
            reachable: true,
        }
    }
}

/// One call to [`RangingRadio::run_ranging`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangingRun {
    pub peripheral: PeripheralId,
    pub configuration: Vec<u8>,
    pub camera_assistance: bool,
}

/// Mock radio that records every call and can script the accessory side
pub struct MockRadio {
    config: RadioConfig,
    status: RadioStatus,
    beacons: Vec<SimulatedBeacon>,
    events: VecDeque<RadioEvent>,
    sent_messages: Vec<(PeripheralId, Vec<u8>)>,
    connect_calls: Vec<PeripheralId>,
    disconnect_calls: Vec<PeripheralId>,
    ranging_runs: Vec<RangingRun>,
    paused: Vec<PeripheralId>,
    refused: Vec<PeripheralId>,
    auto_respond: bool,
    samples_per_session: usize,
    sample_interval: Duration,
    jitter: f32,
    simulate_errors: bool,
    error_probability: f32,
}

impl MockRadio {
    /// Create a powered-on mock radio that only records calls
    pub fn new() -> Self {
        let status = RadioStatus {
            powered_on: true,
            ..RadioStatus::default()
        };

        Self {
            config: RadioConfig::default(),
            status,
            beacons: Vec::new(),
            events: VecDeque::new(),
            sent_messages: Vec::new(),
            connect_calls: Vec::new(),
            disconnect_calls: Vec::new(),
            ranging_runs: Vec::new(),
            paused: Vec::new(),
            refused: Vec::new(),
            auto_respond: false,
            samples_per_session: 0,
            sample_interval: Duration::from_secs(1),
            jitter: 0.0,
            simulate_errors: false,
            error_probability: 0.0,
        }
    }

    /// Create a mock radio that plays the accessory side of the handshake
    /// and streams `samples_per_session` measurements per ranging session
    pub fn simulated(samples_per_session: usize, sample_interval: Duration, jitter: f32) -> Self {
        Self {
            auto_respond: true,
            samples_per_session,
            sample_interval,
            jitter: jitter.max(0.0),
            ..Self::new()
        }
    }

    pub fn with_config(mut self, config: RadioConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a simulated beacon
    pub fn add_beacon(&mut self, beacon: SimulatedBeacon) -> PeripheralId {
        let peripheral = beacon.peripheral;
        self.beacons.push(beacon);
        peripheral
    }

    /// Queue one advertisement per simulated beacon, as a scan would
    pub fn advertise(&mut self) {
        if !self.status.scanning {
            return;
        }
        let sightings: Vec<RadioEvent> = self
            .beacons
            .iter()
            .map(|b| RadioEvent::Discovery(DiscoveryEvent::new(b.peripheral, b.name.clone(), b.rssi)))
            .collect();
        self.events.extend(sightings);
    }

    /// Queue an arbitrary event
    pub fn push_event(&mut self, event: RadioEvent) {
        self.events.push_back(event);
    }

    /// Enable error simulation on writes with given probability (0.0 to 1.0)
    pub fn simulate_errors(&mut self, enable: bool, probability: f32) {
        self.simulate_errors = enable;
        self.error_probability = probability.clamp(0.0, 1.0);
    }

    /// Make `connect` to this peripheral fail synchronously
    pub fn refuse_connect(&mut self, peripheral: PeripheralId) {
        self.refused.push(peripheral);
    }

    pub fn power_off(&mut self) {
        self.status.powered_on = false;
        self.status.scanning = false;
    }

    pub fn sent_messages(&self) -> &[(PeripheralId, Vec<u8>)] {
        &self.sent_messages
    }

    pub fn connect_calls(&self) -> &[PeripheralId] {
        &self.connect_calls
    }

    pub fn disconnect_calls(&self) -> &[PeripheralId] {
        &self.disconnect_calls
    }

    pub fn ranging_runs(&self) -> &[RangingRun] {
        &self.ranging_runs
    }

    pub fn paused(&self) -> &[PeripheralId] {
        &self.paused
    }

    pub fn queued_event_count(&self) -> usize {
        self.events.len()
    }

    fn should_simulate_error(&self) -> bool {
        if !self.simulate_errors {
            return false;
        }
        let mut rng = rand::thread_rng();
        rng.gen::<f32>() < self.error_probability
    }

    fn beacon(&self, peripheral: PeripheralId) -> Option<&SimulatedBeacon> {
        self.beacons.iter().find(|b| b.peripheral == peripheral)
    }

    /// Samples carry a world position only when camera assistance is on
    fn queue_measurements(&mut self, peripheral: PeripheralId, camera_assistance: bool) {
        let Some(position) = self.beacon(peripheral).map(|b| b.position) else {
            return;
        };

        let mut rng = rand::thread_rng();
        let start = Instant::now();
        for k in 0..self.samples_per_session {
            let noise = if self.jitter > 0.0 {
                Vector3::new(
                    rng.gen_range(-self.jitter..=self.jitter),
                    rng.gen_range(-self.jitter..=self.jitter),
                    rng.gen_range(-self.jitter..=self.jitter),
                )
            } else {
                Vector3::zeros()
            };
            let measured = position + noise;
            let sample = RangingSample {
                timestamp: start + self.sample_interval * k as u32,
                location: Some(NearbyLocation {
                    distance: Some(measured.norm()),
                    direction: measured.try_normalize(1e-6),
                    horizontal_angle: Some(measured.x.atan2(-measured.z)),
                }),
                world_position: camera_assistance.then_some(measured),
            };
            self.events
                .push_back(RadioEvent::Ranging(RangingEvent::Measurement { peripheral, sample }));
        }
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl RangingRadio for MockRadio {
    fn start_discovery(&mut self) -> RadioResult<()> {
        if !self.status.powered_on {
            return Err(RadioError::PoweredOff);
        }
        self.status.scanning = true;
        self.advertise();
        Ok(())
    }

    fn stop_discovery(&mut self) {
        self.status.scanning = false;
    }

    fn connect(&mut self, peripheral: PeripheralId) -> RadioResult<()> {
        if !self.status.powered_on {
            return Err(RadioError::PoweredOff);
        }
        self.connect_calls.push(peripheral);
        if self.refused.contains(&peripheral) {
            self.status.error_count += 1;
            return Err(RadioError::ConnectFailed {
                peripheral,
                reason: "connection refused".to_string(),
            });
        }

        if !self.auto_respond {
            self.status.connected = Some(peripheral);
            return Ok(());
        }

        match self.beacon(peripheral) {
            Some(beacon) if beacon.reachable => {
                self.status.connected = Some(peripheral);
                self.events
                    .push_back(RadioEvent::Link(LinkEvent::Connected { peripheral }));
            }
            _ => {
                self.events.push_back(RadioEvent::Link(LinkEvent::ConnectFailed {
                    peripheral,
                    reason: "peripheral unreachable".to_string(),
                }));
            }
        }
        Ok(())
    }

    fn disconnect(&mut self, peripheral: PeripheralId) -> RadioResult<()> {
        self.disconnect_calls.push(peripheral);
        if self.status.connected == Some(peripheral) {
            self.status.connected = None;
        }
        Ok(())
    }

    fn send(&mut self, peripheral: PeripheralId, data: &[u8]) -> RadioResult<()> {
        if self.status.connected != Some(peripheral) {
            return Err(RadioError::NotConnected { peripheral });
        }

        if self.should_simulate_error() {
            self.status.error_count += 1;
            return Err(RadioError::WriteFailed {
                peripheral,
                reason: "simulated write failure".to_string(),
            });
        }

        // Writes are cut at the characteristic's maximum length
        let length = data.len().min(self.config.max_write_length);
        self.sent_messages.push((peripheral, data[..length].to_vec()));
        self.status.messages_sent += 1;

        if self.auto_respond {
            match data.first().copied().map(MessageId::try_from) {
                Some(Ok(MessageId::Initialize)) => {
                    let mut reply = vec![MessageId::AccessoryConfigurationData as u8];
                    reply.extend_from_slice(ACCESSORY_CONFIGURATION);
                    self.events
                        .push_back(RadioEvent::Link(LinkEvent::Data { peripheral, data: reply }));
                }
                Some(Ok(MessageId::ConfigureAndStart)) => {
                    self.events.push_back(RadioEvent::Link(LinkEvent::Data {
                        peripheral,
                        data: vec![MessageId::AccessoryUwbDidStart as u8],
                    }));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn run_ranging(
        &mut self,
        peripheral: PeripheralId,
        configuration: &[u8],
        camera_assistance: bool,
    ) -> RadioResult<()> {
        if configuration.is_empty() {
            return Err(RadioError::Ranging {
                details: "empty accessory configuration".to_string(),
            });
        }
        self.ranging_runs.push(RangingRun {
            peripheral,
            configuration: configuration.to_vec(),
            camera_assistance,
        });
        self.status.ranging = Some(peripheral);

        if self.auto_respond {
            self.events
                .push_back(RadioEvent::Ranging(RangingEvent::ShareableConfiguration {
                    peripheral,
                    data: SHAREABLE_CONFIGURATION.to_vec(),
                }));
            self.queue_measurements(peripheral, camera_assistance);
        }
        Ok(())
    }

    fn pause_ranging(&mut self, peripheral: PeripheralId) {
        self.paused.push(peripheral);
        if self.status.ranging == Some(peripheral) {
            self.status.ranging = None;
        }
    }

    fn read_event(&mut self) -> RadioResult<Option<RadioEvent>> {
        if !self.status.powered_on {
            return Err(RadioError::PoweredOff);
        }
        Ok(self.events.pop_front())
    }

    fn status(&self) -> RadioStatus {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_radio_creation() {
        let radio = MockRadio::new();
        assert!(radio.status().powered_on);
        assert!(!radio.status().scanning);
        assert_eq!(radio.queued_event_count(), 0);
    }

    #[test]
    fn test_discovery_queues_sightings() {
        let mut radio = MockRadio::new();
        radio.add_beacon(SimulatedBeacon::new("B1", -40, Vector3::zeros()));
        radio.add_beacon(SimulatedBeacon::new("B2", -70, Vector3::zeros()));

        radio.start_discovery().unwrap();
        assert_eq!(radio.queued_event_count(), 2);
        assert!(matches!(radio.read_event().unwrap(), Some(RadioEvent::Discovery(_))));
    }

    #[test]
    fn test_send_requires_connection() {
        let mut radio = MockRadio::new();
        let peripheral = PeripheralId::random();

        let result = radio.send(peripheral, &[0x0A]);
        assert!(matches!(result, Err(RadioError::NotConnected { .. })));

        radio.connect(peripheral).unwrap();
        radio.send(peripheral, &[0x0A]).unwrap();
        assert_eq!(radio.sent_messages(), &[(peripheral, vec![0x0A])]);
    }

    #[test]
    fn test_writes_are_truncated() {
        let mut radio = MockRadio::new().with_config(RadioConfig {
            max_write_length: 4,
            ..RadioConfig::default()
        });
        let peripheral = PeripheralId::random();
        radio.connect(peripheral).unwrap();
        radio.send(peripheral, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(radio.sent_messages()[0].1, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_simulated_handshake() {
        let mut radio = MockRadio::simulated(3, Duration::from_secs(1), 0.0);
        let peripheral = radio.add_beacon(SimulatedBeacon::new("B1", -40, Vector3::new(1.0, 0.0, 0.0)));

        radio.connect(peripheral).unwrap();
        assert_eq!(
            radio.read_event().unwrap(),
            Some(RadioEvent::Link(LinkEvent::Connected { peripheral }))
        );

        radio.send(peripheral, &[0x0A]).unwrap();
        match radio.read_event().unwrap() {
            Some(RadioEvent::Link(LinkEvent::Data { data, .. })) => assert_eq!(data[0], 0x01),
            other => panic!("unexpected event {:?}", other),
        }

        radio.run_ranging(peripheral, b"cfg", true).unwrap();
        assert!(matches!(
            radio.read_event().unwrap(),
            Some(RadioEvent::Ranging(RangingEvent::ShareableConfiguration { .. }))
        ));
        assert_eq!(radio.queued_event_count(), 3);
    }

    #[test]
    fn test_ranging_run_records_camera_assistance() {
        let mut radio = MockRadio::simulated(2, Duration::from_secs(1), 0.0);
        let peripheral = radio.add_beacon(SimulatedBeacon::new("B1", -40, Vector3::new(1.0, 0.0, 0.0)));

        radio.run_ranging(peripheral, b"cfg", false).unwrap();
        assert_eq!(
            radio.ranging_runs(),
            &[RangingRun { peripheral, configuration: b"cfg".to_vec(), camera_assistance: false }]
        );

        // Without camera fusion the samples have no world position
        radio.read_event().unwrap();
        match radio.read_event().unwrap() {
            Some(RadioEvent::Ranging(RangingEvent::Measurement { sample, .. })) => {
                assert!(sample.world_position.is_none());
                assert!(sample.location.is_some());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_refused_connect_fails_synchronously() {
        let mut radio = MockRadio::new();
        let peripheral = PeripheralId::random();
        radio.refuse_connect(peripheral);

        assert!(matches!(radio.connect(peripheral), Err(RadioError::ConnectFailed { .. })));
        assert_eq!(radio.connect_calls(), &[peripheral]);
        assert!(radio.status().connected.is_none());
    }

    #[test]
    fn test_unreachable_beacon_fails_connect() {
        let mut radio = MockRadio::simulated(0, Duration::from_secs(1), 0.0);
        let mut beacon = SimulatedBeacon::new("B1", -40, Vector3::zeros());
        beacon.reachable = false;
        let peripheral = radio.add_beacon(beacon);

        radio.connect(peripheral).unwrap();
        assert!(matches!(
            radio.read_event().unwrap(),
            Some(RadioEvent::Link(LinkEvent::ConnectFailed { .. }))
        ));
    }

    #[test]
    fn test_error_simulation() {
        let mut radio = MockRadio::new();
        let peripheral = PeripheralId::random();
        radio.connect(peripheral).unwrap();
        radio.simulate_errors(true, 1.0);

        assert!(radio.send(peripheral, &[0x0A]).is_err());
        assert!(radio.status().error_count > 0);
    }

    #[test]
    fn test_powered_off_radio() {
        let mut radio = MockRadio::new();
        radio.power_off();
        assert_eq!(radio.start_discovery(), Err(RadioError::PoweredOff));
        assert_eq!(radio.connect(PeripheralId::random()), Err(RadioError::PoweredOff));
    }
}
