use crate::error::DomainResult;
use crate::registry::{ConnectionRegistry, SessionId, SubscriberHandle};
use crate::sample::Sample;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};

/// In-memory implementation of ConnectionRegistry backed by RwLock maps.
pub struct InMemoryConnectionRegistry {
    next_session_id: AtomicU64,
    devices: RwLock<HashSet<SessionId>>,
    subscribers: RwLock<HashMap<String, Vec<SubscriberHandle>>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_session_id: AtomicU64::new(1),
            devices: RwLock::new(HashSet::new()),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    fn allocate_session_id(&self) -> SessionId {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for InMemoryConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register_device(&self) -> DomainResult<SessionId> {
        let session_id = self.allocate_session_id();
        let mut devices = self.devices.write().await;
        devices.insert(session_id);
        Ok(session_id)
    }

    async fn unregister_device(&self, session_id: SessionId) -> DomainResult<bool> {
        let mut devices = self.devices.write().await;
        Ok(devices.remove(&session_id))
    }

    async fn subscribe(
        &self,
        patient_id: &str,
        sender: mpsc::Sender<Sample>,
    ) -> DomainResult<SessionId> {
        let session_id = self.allocate_session_id();
        let handle = SubscriberHandle::new(session_id, patient_id.to_string(), sender);
        let mut subscribers = self.subscribers.write().await;
        subscribers
            .entry(patient_id.to_string())
            .or_default()
            .push(handle);
        Ok(session_id)
    }

    async fn unsubscribe(&self, patient_id: &str, session_id: SessionId) -> DomainResult<bool> {
        let mut subscribers = self.subscribers.write().await;
        let Some(watchers) = subscribers.get_mut(patient_id) else {
            return Ok(false);
        };
        let before = watchers.len();
        watchers.retain(|handle| handle.session_id() != session_id);
        let removed = watchers.len() < before;
        if watchers.is_empty() {
            subscribers.remove(patient_id);
        }
        Ok(removed)
    }

    async fn subscribers_for(&self, patient_id: &str) -> DomainResult<Vec<SubscriberHandle>> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers.get(patient_id).cloned().unwrap_or_default())
    }

    async fn device_count(&self) -> DomainResult<usize> {
        let devices = self.devices.read().await;
        Ok(devices.len())
    }

    async fn subscriber_count(&self) -> DomainResult<usize> {
        let subscribers = self.subscribers.read().await;
        Ok(subscribers.values().map(Vec::len).sum())
    }
}
