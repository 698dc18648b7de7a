//! Alignment and measurement-settling algorithms

pub mod heading;
pub mod stability;

pub use heading::{device_orientation_from_camera, HeadingAligner};
pub use stability::StabilityDetector;
