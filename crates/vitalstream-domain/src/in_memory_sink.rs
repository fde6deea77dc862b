use crate::error::DomainResult;
use crate::repository::SampleSink;
use crate::sample::Sample;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory SampleSink. Backs tests and the default single-process
/// wiring; a durable store implements the same trait.
pub struct InMemorySampleSink {
    samples: RwLock<Vec<Sample>>,
}

impl InMemorySampleSink {
    pub fn new() -> Self {
        Self {
            samples: RwLock::new(Vec::new()),
        }
    }

    pub async fn stored_count(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn stored_samples(&self) -> Vec<Sample> {
        self.samples.read().await.clone()
    }
}

impl Default for InMemorySampleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSink for InMemorySampleSink {
    async fn append(&self, sample: &Sample) -> DomainResult<()> {
        let mut samples = self.samples.write().await;
        samples.push(sample.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_preserves_order() {
        let sink = InMemorySampleSink::new();
        for value in [60.0, 61.0, 62.0] {
            let sample = Sample {
                device: "d1".to_string(),
                sensor_type: "hr".to_string(),
                value,
                timestamp_epoch: 1_700_000_000,
                timestamp_millis: 0,
                patient_id: "p1".to_string(),
                encounter_id: "e1".to_string(),
            };
            sink.append(&sample).await.unwrap();
        }

        assert_eq!(sink.stored_count().await, 3);
        let values: Vec<f64> = sink
            .stored_samples()
            .await
            .iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(values, vec![60.0, 61.0, 62.0]);
    }
}
