//! Ranging radio interface trait and configuration

use crate::core::PeripheralId;
use crate::hardware::{RadioEvent, RadioResult};
use serde::{Deserialize, Serialize};

/// Hardware abstraction for the discovery link plus ranging subsystem.
///
/// Calls are made from the control thread only. Results of asynchronous
/// operations (connection, accessory messages, samples) are picked up with
/// [`RangingRadio::read_event`].
pub trait RangingRadio: Send {
    /// Begin scanning for beacon advertisements
    fn start_discovery(&mut self) -> RadioResult<()>;

    /// Stop scanning
    fn stop_discovery(&mut self);

    /// Open the link to a peripheral; completion arrives as a link event
    fn connect(&mut self, peripheral: PeripheralId) -> RadioResult<()>;

    /// Cancel the link to a peripheral
    fn disconnect(&mut self, peripheral: PeripheralId) -> RadioResult<()>;

    /// Write a control message to the accessory
    fn send(&mut self, peripheral: PeripheralId, data: &[u8]) -> RadioResult<()>;

    /// Start the ranging subsystem with an accessory configuration.
    /// With `camera_assistance` the subsystem fuses camera tracking and can
    /// report world positions for its samples.
    fn run_ranging(
        &mut self,
        peripheral: PeripheralId,
        configuration: &[u8],
        camera_assistance: bool,
    ) -> RadioResult<()>;

    /// Release the ranging subsystem
    fn pause_ranging(&mut self, peripheral: PeripheralId);

    /// Take the next pending event.
    /// Returns Ok(None) when nothing is pending (non-blocking).
    fn read_event(&mut self) -> RadioResult<Option<RadioEvent>>;

    /// Get current radio status
    fn status(&self) -> RadioStatus;
}

/// Radio status information
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RadioStatus {
    pub powered_on: bool,
    pub scanning: bool,
    pub connected: Option<PeripheralId>,
    pub ranging: Option<PeripheralId>,
    pub messages_sent: u32,
    pub error_count: u32,
}

impl RadioStatus {
    pub fn is_healthy(&self) -> bool {
        self.powered_on && self.error_count < 10
    }
}

/// Radio configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Largest write accepted by the control characteristic (bytes)
    pub max_write_length: usize,
    /// Let the ranging subsystem fuse camera tracking into samples
    pub camera_assistance: bool,
    /// How often the control loop drains radio events (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            max_write_length: 512,
            camera_assistance: true,
            poll_interval_ms: 20,
        }
    }
}
