//! Remote anchor store
//!
//! Anchors are persisted relative to a beacon frame through an HTTP-shaped
//! service. [`AnchorStore`] checks the local preconditions before any request
//! leaves the device; the service implementations only move bytes.

pub mod wire;
pub mod error;
pub mod service;
pub mod http;
pub mod memory;
pub mod store;

pub use wire::{AnchorRecord, NewAnchorRequest, NewAnchorResponse, WireTransform};
pub use error::{StoreError, StoreResult};
pub use service::{AnchorService, RemoteAnchor};
pub use http::HttpAnchorService;
pub use memory::InMemoryAnchorService;
pub use store::{AnchorStore, DownloadRequest, HostTarget, UploadRequest};
