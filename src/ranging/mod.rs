//! Beacon registry and the single-flight ranging coordinator

pub mod registry;
pub mod schedule;
pub mod coordinator;
pub mod error;

pub use registry::BeaconRegistry;
pub use schedule::RangingSchedule;
pub use coordinator::{
    ActiveSession, CoordinatorEvent, EndReason, RangingCoordinator, RangingParameters, RangingState,
    SessionPhase,
};
pub use error::{RangingError, RangingResult};
