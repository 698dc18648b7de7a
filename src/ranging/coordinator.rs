//! Single-flight ranging coordinator
//!
//! Owns the ranging radio and runs at most one ranging session at a time.
//! Discovery sightings feed the registry and, with auto-scheduling on, pick
//! the next beacon to range. A session walks the accessory handshake, feeds
//! samples through the stability detector and, once settled, publishes the
//! beacon's frame. Every transition is reported as a [`CoordinatorEvent`]
//! that the caller drains after each call.

use crate::algorithms::StabilityDetector;
use crate::core::{
    BeaconFrame, BeaconId, PeripheralId, RangingSample, STABILITY_DWELL, STABILITY_THRESHOLD,
    STALE_INTERVAL,
};
use crate::hardware::{
    AccessoryMessage, ControlMessage, DiscoveryEvent, LinkEvent, RadioEvent, RangingEvent,
    RangingRadio,
};
use crate::ranging::{BeaconRegistry, RangingError, RangingResult, RangingSchedule};
use nalgebra::UnitQuaternion;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Tuning for scheduling and settling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangingParameters {
    pub stale_interval: Duration,
    pub stability_threshold: f32,
    pub stability_dwell: Duration,
    /// Passed to the ranging subsystem on every run
    pub camera_assistance: bool,
}

impl Default for RangingParameters {
    fn default() -> Self {
        Self {
            stale_interval: STALE_INTERVAL,
            stability_threshold: STABILITY_THRESHOLD,
            stability_dwell: STABILITY_DWELL,
            camera_assistance: true,
        }
    }
}

/// Progress of the active session's handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Link requested, waiting for the connection
    Connecting,
    /// Initialize sent, waiting for the accessory configuration
    Handshaking,
    /// Ranging subsystem running
    Ranging,
}

/// The one beacon currently holding the ranging radio
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub beacon: BeaconId,
    pub peripheral: PeripheralId,
    pub phase: SessionPhase,
    pub started_at: Instant,
    pub samples: u32,
    detector: StabilityDetector,
}

/// Coordinator state; `Busy` holds the only active session
#[derive(Debug, Clone)]
pub enum RangingState {
    Idle,
    Busy(ActiveSession),
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Another beacon took the radio
    Preempted,
    /// Explicit disconnect
    Requested,
    ConnectFailed,
    LinkLost,
    /// Samples settled and the frame was published
    Stabilized,
    ObjectRemoved,
    AccessoryStopped,
    ProtocolError,
    RadioError,
}

/// Publications for downstream components
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    BeaconDiscovered { beacon: BeaconId },
    SessionStarted { beacon: BeaconId },
    SampleRecorded { beacon: BeaconId, sample: RangingSample },
    FramePublished { beacon: BeaconId, frame: BeaconFrame },
    /// Beacon finished auto-ranging for this cycle
    RangingCompleted { beacon: BeaconId },
    SessionEnded { beacon: BeaconId, reason: EndReason },
}

/// Ranging state machine over a radio implementation
pub struct RangingCoordinator<R: RangingRadio> {
    radio: R,
    registry: BeaconRegistry,
    state: RangingState,
    frames: HashMap<BeaconId, BeaconFrame>,
    done: HashSet<BeaconId>,
    auto_scheduling: bool,
    alignment: Option<UnitQuaternion<f32>>,
    parameters: RangingParameters,
    outbox: Vec<CoordinatorEvent>,
}

impl<R: RangingRadio> RangingCoordinator<R> {
    pub fn new(radio: R, parameters: RangingParameters) -> Self {
        Self {
            radio,
            registry: BeaconRegistry::new(),
            state: RangingState::Idle,
            frames: HashMap::new(),
            done: HashSet::new(),
            auto_scheduling: false,
            alignment: None,
            parameters,
            outbox: Vec::new(),
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn registry(&self) -> &BeaconRegistry {
        &self.registry
    }

    pub fn state(&self) -> &RangingState {
        &self.state
    }

    /// Beacon holding the radio, if any
    pub fn busy_beacon(&self) -> Option<BeaconId> {
        match &self.state {
            RangingState::Busy(session) => Some(session.beacon),
            RangingState::Idle => None,
        }
    }

    pub fn frame(&self, beacon: BeaconId) -> Option<&BeaconFrame> {
        self.frames.get(&beacon)
    }

    pub fn frames(&self) -> &HashMap<BeaconId, BeaconFrame> {
        &self.frames
    }

    pub fn is_done(&self, beacon: BeaconId) -> bool {
        self.done.contains(&beacon)
    }

    pub fn done_count(&self) -> usize {
        self.done.len()
    }

    pub fn auto_scheduling(&self) -> bool {
        self.auto_scheduling
    }

    pub fn alignment(&self) -> Option<UnitQuaternion<f32>> {
        self.alignment
    }

    /// Latest heading alignment wins; absent values never clear it
    pub fn set_alignment(&mut self, alignment: UnitQuaternion<f32>) {
        self.alignment = Some(alignment);
    }

    /// Take everything published since the last drain
    pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Flip auto-scheduling; every toggle starts a fresh cycle
    pub fn toggle_auto_scheduling(&mut self, now: Instant) {
        self.done.clear();
        self.auto_scheduling = !self.auto_scheduling;
        info!(enabled = self.auto_scheduling, "auto scheduling toggled");
        self.perform_next(now);
    }

    /// Beacons eligible right now
    pub fn schedule(&self, now: Instant) -> RangingSchedule {
        RangingSchedule::derive(&self.registry, &self.done, now, self.parameters.stale_interval)
    }

    /// Start ranging the strongest eligible beacon when idle and auto-scheduling.
    ///
    /// A connect refused on the spot moves on to the next candidate of the
    /// same schedule; each candidate is tried at most once per call.
    pub fn perform_next(&mut self, now: Instant) {
        if !self.auto_scheduling || self.busy_beacon().is_some() {
            return;
        }

        let schedule = self.schedule(now);
        for beacon in schedule.candidates() {
            match self.connect(beacon, now) {
                Ok(()) => return,
                Err(e) => warn!(beacon = %beacon, error = %e, "scheduled connect failed"),
            }
        }
    }

    /// Take the radio for `beacon`, preempting any active session
    pub fn connect(&mut self, beacon: BeaconId, now: Instant) -> RangingResult<()> {
        let peripheral = self
            .registry
            .get(beacon)
            .map(|b| b.peripheral)
            .ok_or(RangingError::UnknownBeacon(beacon))?;

        self.teardown(EndReason::Preempted, now);

        info!(beacon = %beacon, peripheral = %peripheral, "connecting");
        self.state = RangingState::Busy(ActiveSession {
            beacon,
            peripheral,
            phase: SessionPhase::Connecting,
            started_at: now,
            samples: 0,
            detector: StabilityDetector::new(
                self.parameters.stability_threshold,
                self.parameters.stability_dwell,
            ),
        });
        self.outbox.push(CoordinatorEvent::SessionStarted { beacon });

        if let Err(e) = self.radio.connect(peripheral) {
            self.teardown(EndReason::ConnectFailed, now);
            return Err(e.into());
        }
        Ok(())
    }

    /// Release the radio if `beacon` holds it, then schedule the next one
    pub fn disconnect(&mut self, beacon: BeaconId, now: Instant) {
        if self.busy_beacon() == Some(beacon) {
            self.end_session(EndReason::Requested, now);
        } else if let Some(peripheral) = self.registry.get(beacon).map(|b| b.peripheral) {
            if let Err(e) = self.radio.disconnect(peripheral) {
                debug!(beacon = %beacon, error = %e, "disconnect of idle beacon failed");
            }
        }
    }

    /// Dispatch one radio event
    pub fn handle_radio_event(&mut self, event: RadioEvent, now: Instant) -> RangingResult<()> {
        match event {
            RadioEvent::Discovery(event) => {
                self.handle_discovery(event, now);
                Ok(())
            }
            RadioEvent::Link(event) => self.handle_link(event, now),
            RadioEvent::Ranging(event) => self.handle_ranging(event, now),
        }
    }

    pub fn handle_discovery(&mut self, event: DiscoveryEvent, now: Instant) {
        let (beacon, is_new) = self.registry.record_sighting(&event);
        if is_new {
            self.outbox.push(CoordinatorEvent::BeaconDiscovered { beacon });
        }
        self.perform_next(now);
    }

    pub fn handle_link(&mut self, event: LinkEvent, now: Instant) -> RangingResult<()> {
        match event {
            LinkEvent::Connected { peripheral } => {
                let Some(session) = self.session_for(peripheral) else {
                    debug!(peripheral = %peripheral, "connected to a peripheral we no longer want");
                    return Ok(());
                };
                session.phase = SessionPhase::Handshaking;
                info!(beacon = %session.beacon, "connected, initializing accessory");
                self.send_control(peripheral, ControlMessage::Initialize, now)
            }
            LinkEvent::ConnectFailed { peripheral, reason } => {
                if self.session_for(peripheral).is_some() {
                    warn!(peripheral = %peripheral, reason = %reason, "connect failed");
                    self.end_session(EndReason::ConnectFailed, now);
                }
                Ok(())
            }
            LinkEvent::Disconnected { peripheral } => {
                if self.session_for(peripheral).is_some() {
                    warn!(peripheral = %peripheral, "link lost during session");
                    self.end_session(EndReason::LinkLost, now);
                }
                Ok(())
            }
            LinkEvent::Data { peripheral, data } => self.handle_accessory_data(peripheral, &data, now),
        }
    }

    fn handle_accessory_data(
        &mut self,
        peripheral: PeripheralId,
        data: &[u8],
        now: Instant,
    ) -> RangingResult<()> {
        if self.session_for(peripheral).is_none() {
            debug!(peripheral = %peripheral, "accessory data outside a session");
            return Ok(());
        }

        let message = match AccessoryMessage::decode(data) {
            Ok(message) => message,
            Err(source) => {
                error!(peripheral = %peripheral, error = %source, "aborting handshake");
                self.end_session(EndReason::ProtocolError, now);
                return Err(RangingError::Protocol { peripheral, source });
            }
        };

        match message {
            AccessoryMessage::ConfigurationData(configuration) => {
                let camera_assistance = self.parameters.camera_assistance;
                if let Err(e) = self.radio.run_ranging(peripheral, &configuration, camera_assistance) {
                    error!(peripheral = %peripheral, error = %e, "ranging subsystem rejected configuration");
                    self.end_session(EndReason::RadioError, now);
                    return Err(e.into());
                }
                if let Some(session) = self.session_for(peripheral) {
                    session.phase = SessionPhase::Ranging;
                }
                Ok(())
            }
            AccessoryMessage::UwbDidStart => {
                debug!(peripheral = %peripheral, "accessory started ranging");
                Ok(())
            }
            AccessoryMessage::UwbDidStop => {
                info!(peripheral = %peripheral, "accessory stopped ranging");
                self.end_session(EndReason::AccessoryStopped, now);
                Ok(())
            }
            AccessoryMessage::Ignored(id) => {
                debug!(peripheral = %peripheral, message = ?id, "ignoring accessory message");
                Ok(())
            }
        }
    }

    pub fn handle_ranging(&mut self, event: RangingEvent, now: Instant) -> RangingResult<()> {
        match event {
            RangingEvent::ShareableConfiguration { peripheral, data } => {
                let Some(session) = self.session_for(peripheral) else {
                    return Ok(());
                };
                session.detector.reset();
                self.send_control(peripheral, ControlMessage::ConfigureAndStart(data), now)
            }
            RangingEvent::Measurement { peripheral, sample } => {
                self.handle_measurement(peripheral, sample, now);
                Ok(())
            }
            RangingEvent::ObjectRemoved { peripheral } => {
                if self.session_for(peripheral).is_some() {
                    info!(peripheral = %peripheral, "measured object removed");
                    self.end_session(EndReason::ObjectRemoved, now);
                }
                Ok(())
            }
            RangingEvent::Suspended { peripheral } => {
                if self.session_for(peripheral).is_none() {
                    return Ok(());
                }
                self.send_control(peripheral, ControlMessage::Stop, now)
            }
            RangingEvent::SuspensionEnded { peripheral } => {
                if self.session_for(peripheral).is_none() {
                    return Ok(());
                }
                self.send_control(peripheral, ControlMessage::Initialize, now)
            }
            RangingEvent::Invalidated { peripheral, reason } => {
                if self.session_for(peripheral).is_some() {
                    warn!(peripheral = %peripheral, reason = %reason, "ranging session invalidated");
                    self.end_session(EndReason::RadioError, now);
                }
                Ok(())
            }
        }
    }

    fn handle_measurement(&mut self, peripheral: PeripheralId, mut sample: RangingSample, now: Instant) {
        let Some(beacon) = self.session_for(peripheral).map(|s| s.beacon) else {
            return;
        };

        // A sample without a resolved position keeps the previous one
        if sample.world_position.is_none() {
            sample.world_position = self
                .registry
                .get(beacon)
                .and_then(|b| b.last_ranging)
                .and_then(|r| r.world_position);
        }
        self.registry.record_ranging(beacon, sample);
        self.outbox.push(CoordinatorEvent::SampleRecorded { beacon, sample });

        let Some(position) = sample.world_position else {
            return;
        };

        let stabilized = match self.session_for(peripheral) {
            Some(session) => {
                session.samples += 1;
                session.detector.update(position, sample.timestamp)
            }
            None => false,
        };
        if !stabilized {
            return;
        }

        let frame = BeaconFrame::new(position, self.alignment.unwrap_or_else(UnitQuaternion::identity));
        self.frames.insert(beacon, frame);
        self.outbox.push(CoordinatorEvent::FramePublished { beacon, frame });

        if self.auto_scheduling {
            self.done.insert(beacon);
            self.outbox.push(CoordinatorEvent::RangingCompleted { beacon });
        }

        let name = self.registry.get(beacon).map(|b| b.display_name());
        info!(
            beacon = %beacon,
            name = ?name,
            position = ?(position.x, position.y, position.z),
            aligned = self.alignment.is_some(),
            "finished ranging"
        );
        self.end_session(EndReason::Stabilized, now);
    }

    fn send_control(
        &mut self,
        peripheral: PeripheralId,
        message: ControlMessage,
        now: Instant,
    ) -> RangingResult<()> {
        debug!(peripheral = %peripheral, message = ?message.id(), "sending control message");
        if let Err(e) = self.radio.send(peripheral, &message.encode()) {
            warn!(peripheral = %peripheral, error = %e, "control write failed");
            self.end_session(EndReason::RadioError, now);
            return Err(e.into());
        }
        Ok(())
    }

    fn session_for(&mut self, peripheral: PeripheralId) -> Option<&mut ActiveSession> {
        match &mut self.state {
            RangingState::Busy(session) if session.peripheral == peripheral => Some(session),
            _ => None,
        }
    }

    /// Release the radio and return to idle without rescheduling
    fn teardown(&mut self, reason: EndReason, now: Instant) -> Option<ActiveSession> {
        let RangingState::Busy(session) = std::mem::replace(&mut self.state, RangingState::Idle) else {
            return None;
        };

        if let Err(e) = self.radio.disconnect(session.peripheral) {
            debug!(beacon = %session.beacon, error = %e, "disconnect failed during teardown");
        }
        self.radio.pause_ranging(session.peripheral);

        info!(
            beacon = %session.beacon,
            reason = ?reason,
            samples = session.samples,
            duration_ms = now.saturating_duration_since(session.started_at).as_millis() as u64,
            "session ended"
        );
        self.outbox.push(CoordinatorEvent::SessionEnded {
            beacon: session.beacon,
            reason,
        });
        Some(session)
    }

    fn end_session(&mut self, reason: EndReason, now: Instant) {
        self.teardown(reason, now);
        self.perform_next(now);
    }
}
