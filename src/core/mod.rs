//! Core types and constants for beacon-relative anchor alignment

pub mod types;
pub mod constants;
pub mod transform;
pub mod error;

pub use types::*;
pub use constants::*;
pub use transform::*;
pub use error::ErrorClass;
