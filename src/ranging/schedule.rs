//! Scheduling candidacy derived from the registry

use crate::core::BeaconId;
use crate::ranging::BeaconRegistry;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Beacons eligible for the next ranging session, strongest signal first.
///
/// Derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangingSchedule {
    candidates: Vec<(BeaconId, i16)>,
}

impl RangingSchedule {
    /// Non-stale beacons that have not finished auto-ranging this cycle
    pub fn derive(
        registry: &BeaconRegistry,
        done: &HashSet<BeaconId>,
        now: Instant,
        stale_interval: Duration,
    ) -> Self {
        let mut candidates: Vec<(BeaconId, i16)> = registry
            .iter()
            .filter(|b| !done.contains(&b.id) && !b.is_stale(now, stale_interval))
            .filter_map(|b| b.last_scan.map(|scan| (b.id, scan.rssi)))
            .collect();

        // Stable sort keeps discovery order among equal signals
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        Self { candidates }
    }

    /// Strongest candidate, if any
    pub fn next(&self) -> Option<BeaconId> {
        self.candidates.first().map(|(id, _)| *id)
    }

    pub fn candidates(&self) -> impl Iterator<Item = BeaconId> + '_ {
        self.candidates.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
