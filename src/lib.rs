//! Beacon-relative spatial anchor synchronization
//!
//! Discovers nearby ranging beacons, ranges them one at a time until their
//! position settles, and uses the resulting beacon frames to host and
//! resolve spatial anchors shared through a remote anchor store.

pub mod core;
pub mod algorithms;
pub mod hardware;
pub mod ranging;
pub mod api;
pub mod reconcile;
pub mod tracking;
pub mod runtime;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{Anchor, BacklogAnchor, Beacon, BeaconFrame, BeaconId, ErrorClass, Transform};
pub use algorithms::{HeadingAligner, StabilityDetector};
pub use hardware::{MockRadio, RadioConfig, RadioError, RadioEvent, RangingRadio, RangingRun, SimulatedBeacon};
pub use ranging::{CoordinatorEvent, RangingCoordinator, RangingError, RangingParameters, RangingState};
pub use api::{AnchorService, AnchorStore, HttpAnchorService, InMemoryAnchorService, StoreError};
pub use reconcile::BacklogReconciler;
pub use tracking::{RecordingTracker, TrackingSession, WorldMappingStatus};
pub use runtime::{ControlEvent, Controller, ControllerHandle, StatusReport};
pub use utils::{ConfigError, ConfigurationManager, SystemConfig};
