use crate::error::DomainResult;
use crate::registry::ConnectionRegistry;
use crate::sample::Sample;
use std::sync::Arc;
use tracing::debug;

/// Fans flushed samples out to every monitor watching the originating
/// patient. Best-effort per subscriber: one failed delivery never affects
/// the others or the ingestion session.
pub struct BroadcastRouter {
    registry: Arc<dyn ConnectionRegistry>,
}

impl BroadcastRouter {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver flushed samples, returning how many deliveries succeeded.
    pub async fn broadcast(&self, samples: &[Sample]) -> DomainResult<usize> {
        let mut delivered = 0;
        for sample in samples {
            let subscribers = self.registry.subscribers_for(&sample.patient_id).await?;
            for subscriber in subscribers {
                if subscriber.try_deliver(sample.clone()) {
                    delivered += 1;
                } else {
                    debug!(
                        patient_id = %sample.patient_id,
                        subscriber_session = subscriber.session_id(),
                        "Dropping sample for slow or closed subscriber"
                    );
                }
            }
        }
        Ok(delivered)
    }
}
