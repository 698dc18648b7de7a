//! Anchor reconciliation between the tracking session and the anchor store
//!
//! Anchors placed by the user wait in a backlog until a nearby beacon frame
//! lets them be hosted. Anchors downloaded for a beacon are placed in the
//! tracking session once that beacon's frame is known.

pub mod source;
pub mod backlog;

pub use source::FrameSource;
pub use backlog::{nearest_beacon, BacklogReconciler, UploadJob};
