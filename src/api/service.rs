//! Anchor service interface

use crate::api::StoreResult;
use crate::core::{AnchorId, Transform};
use async_trait::async_trait;

/// Anchor as returned by the service, not yet tied to a local beacon
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAnchor {
    pub id: AnchorId,
    pub relative_transform: Transform,
}

/// HTTP-shaped key-value store of beacon-relative anchors.
///
/// Every call is a fresh request, so callers may retry freely. Last write
/// wins when several devices host against the same beacon.
#[async_trait]
pub trait AnchorService: Send + Sync {
    /// Persist a transform relative to the named beacon
    async fn create_anchor(&self, beacon_name: &str, relative: &Transform) -> StoreResult<AnchorId>;

    /// Every anchor hosted against the named beacon, in service order
    async fn list_anchors(&self, beacon_name: &str) -> StoreResult<Vec<RemoteAnchor>>;
}
