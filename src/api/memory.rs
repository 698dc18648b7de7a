//! In-process anchor service for tests and the demo

use crate::api::{AnchorService, RemoteAnchor, StoreError, StoreResult};
use crate::core::{AnchorId, Transform};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Anchor service backed by a map, counting every call
#[derive(Debug, Default)]
pub struct InMemoryAnchorService {
    anchors: Mutex<HashMap<String, Vec<RemoteAnchor>>>,
    create_calls: AtomicUsize,
    list_calls: AtomicUsize,
    failures_pending: AtomicUsize,
}

impl InMemoryAnchorService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an anchor as if another device had hosted it
    pub fn seed(&self, beacon_name: &str, relative: Transform) -> AnchorId {
        let id = Uuid::new_v4();
        self.anchors()
            .entry(beacon_name.to_string())
            .or_default()
            .push(RemoteAnchor { id, relative_transform: relative });
        id
    }

    /// Fail the next `count` calls with a transport error
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, beacon_name: &str) -> Vec<RemoteAnchor> {
        self.anchors().get(beacon_name).cloned().unwrap_or_default()
    }

    fn anchors(&self) -> MutexGuard<'_, HashMap<String, Vec<RemoteAnchor>>> {
        self.anchors.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_failure(&self) -> StoreResult<()> {
        let injected = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Transport {
                message: "simulated outage".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AnchorService for InMemoryAnchorService {
    async fn create_anchor(&self, beacon_name: &str, relative: &Transform) -> StoreResult<AnchorId> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        Ok(self.seed(beacon_name, *relative))
    }

    async fn list_anchors(&self, beacon_name: &str) -> StoreResult<Vec<RemoteAnchor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        Ok(self.stored(beacon_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_list() {
        let service = InMemoryAnchorService::new();
        let id = service.create_anchor("B1", &Transform::identity()).await.unwrap();

        let listed = service.list_anchors("B1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert!(service.list_anchors("B2").await.unwrap().is_empty());
        assert_eq!(service.create_calls(), 1);
        assert_eq!(service.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let service = InMemoryAnchorService::new();
        service.fail_next(1);

        let first = service.create_anchor("B1", &Transform::identity()).await;
        assert!(matches!(first, Err(StoreError::Transport { .. })));
        assert!(service.create_anchor("B1", &Transform::identity()).await.is_ok());
        assert_eq!(service.stored("B1").len(), 1);
    }
}
