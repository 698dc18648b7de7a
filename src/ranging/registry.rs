//! Registry of discovered beacons

use crate::core::{Beacon, BeaconId, PeripheralId, RangingSample, ScanSnapshot};
use crate::hardware::DiscoveryEvent;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Every beacon seen during the session, keyed by generated id.
///
/// Beacons are never removed; a beacon that stops advertising simply goes
/// stale.
#[derive(Debug, Default)]
pub struct BeaconRegistry {
    beacons: BTreeMap<BeaconId, Beacon>,
    by_peripheral: HashMap<PeripheralId, BeaconId>,
    next_id: u32,
}

impl BeaconRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an advertisement sighting. Returns the beacon id and whether
    /// the beacon was seen for the first time.
    pub fn record_sighting(&mut self, event: &DiscoveryEvent) -> (BeaconId, bool) {
        let (id, is_new) = match self.by_peripheral.get(&event.peripheral) {
            Some(id) => (*id, false),
            None => {
                self.next_id += 1;
                let id = BeaconId(self.next_id);
                self.by_peripheral.insert(event.peripheral, id);
                self.beacons
                    .insert(id, Beacon::new(id, event.peripheral, event.name.clone()));
                debug!(beacon = %id, peripheral = %event.peripheral, name = ?event.name, "new beacon");
                (id, true)
            }
        };

        if let Some(beacon) = self.beacons.get_mut(&id) {
            if event.name.is_some() {
                beacon.name = event.name.clone();
            }
            beacon.last_scan = Some(ScanSnapshot {
                timestamp: event.timestamp,
                rssi: event.rssi,
            });
        }

        (id, is_new)
    }

    /// Store the latest ranging sample for a beacon
    pub fn record_ranging(&mut self, id: BeaconId, sample: RangingSample) -> bool {
        match self.beacons.get_mut(&id) {
            Some(beacon) => {
                beacon.last_ranging = Some(sample);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: BeaconId) -> Option<&Beacon> {
        self.beacons.get(&id)
    }

    pub fn lookup(&self, peripheral: PeripheralId) -> Option<BeaconId> {
        self.by_peripheral.get(&peripheral).copied()
    }

    /// Beacons in id (discovery) order
    pub fn iter(&self) -> impl Iterator<Item = &Beacon> {
        self.beacons.values()
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }
}
