//! Tracking session collaborator
//!
//! The tracking subsystem supplies device poses and mapping quality, and
//! lets the core place named pose anchors that the renderer attaches
//! content to.

pub mod session;
pub mod recording;

pub use session::{Placement, TrackingSession, WorldMappingStatus};
pub use recording::RecordingTracker;
