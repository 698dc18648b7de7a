//! Timing and geometry parameters

use std::time::Duration;

/// A beacon not sighted within this window is ineligible for scheduling
pub const STALE_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum displacement between consecutive samples that still counts as settled (meters)
pub const STABILITY_THRESHOLD: f32 = 0.1;

/// How long samples must stay settled before ranging stops
pub const STABILITY_DWELL: Duration = Duration::from_secs(15);

/// Direction-cosine limit for both tilt checks of the heading aligner
pub const TILT_LIMIT: f32 = 0.1;

/// Name given to anchors placed in the tracking session
pub const DEFAULT_ANCHOR_NAME: &str = "bunny";
