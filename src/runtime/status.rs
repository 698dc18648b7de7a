//! Aggregate status of the control actor

use crate::core::BeaconId;
use crate::hardware::RadioStatus;
use crate::tracking::WorldMappingStatus;
use std::collections::BTreeMap;
use std::fmt;

/// Anchors known for one beacon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorSummary {
    pub total: usize,
    pub resolved: usize,
    /// Distance of the farthest anchor from the beacon (meters)
    pub farthest: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub busy_beacon: Option<BeaconId>,
    pub auto_scheduling: bool,
    pub beacons: usize,
    pub done: usize,
    pub frames: usize,
    pub aligned: bool,
    pub backlog: usize,
    pub uploads_in_flight: usize,
    /// Network tasks whose results have not come back yet
    pub network_tasks: usize,
    pub anchors: BTreeMap<BeaconId, AnchorSummary>,
    pub world_mapping: WorldMappingStatus,
    pub radio: RadioStatus,
}

impl StatusReport {
    pub fn resolved_anchors(&self) -> usize {
        self.anchors.values().map(|a| a.resolved).sum()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.busy_beacon {
            Some(beacon) => writeln!(f, "ranging:        {}", beacon)?,
            None => writeln!(f, "ranging:        idle")?,
        }
        writeln!(f, "auto schedule:  {}", if self.auto_scheduling { "on" } else { "off" })?;
        writeln!(f, "beacons:        {} seen, {} done, {} framed", self.beacons, self.done, self.frames)?;
        writeln!(f, "heading:        {}", if self.aligned { "aligned" } else { "unaligned" })?;
        writeln!(f, "world mapping:  {}", self.world_mapping)?;
        if self.backlog > 0 {
            let plural = if self.backlog > 1 { "s" } else { "" };
            writeln!(f, "backlog:        hosting {} anchor{} to server", self.backlog, plural)?;
        }
        for (beacon, summary) in &self.anchors {
            writeln!(
                f,
                "  {}: {} anchors, {} resolved, farthest {:.2} m",
                beacon, summary.total, summary.resolved, summary.farthest
            )?;
        }
        write!(
            f,
            "radio:          {} messages, {} errors ({})",
            self.radio.messages_sent,
            self.radio.error_count,
            if self.radio.is_healthy() { "ok" } else { "degraded" }
        )
    }
}
