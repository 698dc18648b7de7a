//! Single control actor
//!
//! All ranging, registry and reconciliation state lives on one task. Radio
//! polling, user input and network completions reach it as
//! [`ControlEvent`] messages over one queue, so no state is ever touched
//! from two places at once.

pub mod event;
pub mod status;
pub mod controller;

pub use event::{ControlEvent, ControllerClosed, ControllerHandle};
pub use status::{AnchorSummary, StatusReport};
pub use controller::Controller;
