//! Ranging radio abstraction
//!
//! The radio collaborator handles discovery, the link to one beacon at a
//! time, and the ranging subsystem that produces position samples. Events
//! come back as a tagged union per concern and control messages travel over
//! the link using the small protocol in [`protocol`].

pub mod radio;
pub mod events;
pub mod protocol;
pub mod mock;
pub mod error;

pub use radio::{RadioConfig, RadioStatus, RangingRadio};
pub use events::{DiscoveryEvent, LinkEvent, RadioEvent, RangingEvent};
pub use protocol::{AccessoryMessage, ControlMessage, MessageId, ProtocolError};
pub use mock::{MockRadio, RangingRun, SimulatedBeacon};
pub use error::{RadioError, RadioResult};
