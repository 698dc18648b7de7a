//! Events reported by the ranging radio

use crate::core::{PeripheralId, RangingSample};
use std::time::Instant;

/// Advertisement sighting during discovery
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryEvent {
    pub peripheral: PeripheralId,
    pub name: Option<String>,
    /// Received signal strength (dBm)
    pub rssi: i16,
    pub timestamp: Instant,
}

impl DiscoveryEvent {
    pub fn new(peripheral: PeripheralId, name: Option<String>, rssi: i16) -> Self {
        Self {
            peripheral,
            name,
            rssi,
            timestamp: Instant::now(),
        }
    }

    pub fn at(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Link lifecycle and inbound accessory traffic
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected { peripheral: PeripheralId },
    ConnectFailed { peripheral: PeripheralId, reason: String },
    Disconnected { peripheral: PeripheralId },
    /// Raw accessory message, decoded by the coordinator
    Data { peripheral: PeripheralId, data: Vec<u8> },
}

/// Output of the local ranging subsystem
#[derive(Debug, Clone, PartialEq)]
pub enum RangingEvent {
    /// Configuration to forward to the accessory
    ShareableConfiguration { peripheral: PeripheralId, data: Vec<u8> },
    Measurement { peripheral: PeripheralId, sample: RangingSample },
    /// The measured object is no longer tracked
    ObjectRemoved { peripheral: PeripheralId },
    Suspended { peripheral: PeripheralId },
    SuspensionEnded { peripheral: PeripheralId },
    Invalidated { peripheral: PeripheralId, reason: String },
}

/// Everything the radio can report
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    Discovery(DiscoveryEvent),
    Link(LinkEvent),
    Ranging(RangingEvent),
}

impl RadioEvent {
    pub fn peripheral(&self) -> PeripheralId {
        match self {
            RadioEvent::Discovery(event) => event.peripheral,
            RadioEvent::Link(LinkEvent::Connected { peripheral })
            | RadioEvent::Link(LinkEvent::ConnectFailed { peripheral, .. })
            | RadioEvent::Link(LinkEvent::Disconnected { peripheral })
            | RadioEvent::Link(LinkEvent::Data { peripheral, .. }) => *peripheral,
            RadioEvent::Ranging(RangingEvent::ShareableConfiguration { peripheral, .. })
            | RadioEvent::Ranging(RangingEvent::Measurement { peripheral, .. })
            | RadioEvent::Ranging(RangingEvent::ObjectRemoved { peripheral })
            | RadioEvent::Ranging(RangingEvent::Suspended { peripheral })
            | RadioEvent::Ranging(RangingEvent::SuspensionEnded { peripheral })
            | RadioEvent::Ranging(RangingEvent::Invalidated { peripheral, .. }) => *peripheral,
        }
    }
}
