use crate::error::DomainResult;
use crate::sample::Sample;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Process-unique identifier for one live connection (device or monitor).
pub type SessionId = u64;

/// Delivery handle for one monitoring client, bound to exactly one patient.
///
/// Wraps a bounded channel; a full or closed channel means that subscriber
/// simply misses the sample. Delivery is best-effort and never blocks the
/// ingestion path.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    session_id: SessionId,
    patient_id: String,
    sender: mpsc::Sender<Sample>,
}

impl SubscriberHandle {
    pub fn new(session_id: SessionId, patient_id: String, sender: mpsc::Sender<Sample>) -> Self {
        Self {
            session_id,
            patient_id,
            sender,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Attempt delivery without waiting. Returns whether the subscriber
    /// accepted the sample.
    pub fn try_deliver(&self, sample: Sample) -> bool {
        self.sender.try_send(sample).is_ok()
    }
}

/// Tracks live device sessions and, per patient, the monitoring clients
/// watching that patient.
///
/// Removal operations are idempotent and report whether anything was
/// actually removed, so session teardown can run on every exit path
/// without risking a double-free.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Register a new device session, returning its id.
    async fn register_device(&self) -> DomainResult<SessionId>;

    /// Remove a device session. Returns false if it was already gone.
    async fn unregister_device(&self, session_id: SessionId) -> DomainResult<bool>;

    /// Register a monitoring client for one patient, returning its id.
    async fn subscribe(
        &self,
        patient_id: &str,
        sender: mpsc::Sender<Sample>,
    ) -> DomainResult<SessionId>;

    /// Remove a monitoring client. Returns false if it was already gone.
    async fn unsubscribe(&self, patient_id: &str, session_id: SessionId) -> DomainResult<bool>;

    /// Snapshot of the subscribers currently watching one patient.
    async fn subscribers_for(&self, patient_id: &str) -> DomainResult<Vec<SubscriberHandle>>;

    async fn device_count(&self) -> DomainResult<usize>;

    async fn subscriber_count(&self) -> DomainResult<usize>;
}
