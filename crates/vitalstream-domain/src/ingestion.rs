use crate::broadcast::BroadcastRouter;
use crate::encounter::stamp_encounter;
use crate::error::DomainError;
use crate::registry::ConnectionRegistry;
use crate::repository::SampleSink;
use crate::sample::parse_sample;
use crate::series_buffer::SeriesBuffer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Inbound text the device is expected to echo back for our keep-alives.
const KEEPALIVE_ACK: &str = "keepalive-ack";
/// Literal application-level ping from the device.
const PING: &str = "ping";
/// Literal reply to an inbound ping.
const PONG: &str = "pong";

/// Tuning for the shared buffer: downsample target per series and minimum
/// wall-clock gap between flushes.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub downsample_target: usize,
    pub flush_interval: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            downsample_target: 2,
            flush_interval: Duration::from_secs(1),
        }
    }
}

/// What the transport should do with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Reply with the literal `pong`.
    Pong,
    /// Keep-alive echo, consumed silently.
    KeepAliveAck,
    /// Schema mismatch; notify the peer and keep the loop alive.
    Rejected(String),
    /// Sample accepted; `flushed`/`delivered` report a flush that fired.
    Accepted { flushed: usize, delivered: usize },
}

/// Orchestrates the per-message ingestion path shared by every device
/// session: parse, persist, buffer, opportunistically flush, broadcast.
///
/// Flow per valid sample:
/// 1. Append to the persistence sink (failure logged, never fatal)
/// 2. Append to the shared SeriesBuffer under its series key
/// 3. If the flush window elapsed, downsample every series and clear
/// 4. Route flushed samples to the patients' subscribers
pub struct IngestionService {
    buffer: Mutex<SeriesBuffer>,
    sink: Arc<dyn SampleSink>,
    router: BroadcastRouter,
}

impl IngestionService {
    pub fn new(
        sink: Arc<dyn SampleSink>,
        registry: Arc<dyn ConnectionRegistry>,
        config: IngestionConfig,
    ) -> Self {
        Self {
            buffer: Mutex::new(SeriesBuffer::new(
                config.downsample_target,
                config.flush_interval,
            )),
            sink,
            router: BroadcastRouter::new(registry),
        }
    }

    /// Handle one inbound text frame from a device session.
    ///
    /// `session_encounter_id` is the id resolved at connect time; samples
    /// arriving without an explicit encounter id are stamped with it.
    pub async fn handle_text(&self, text: &str, session_encounter_id: &str) -> InboundOutcome {
        match text.trim() {
            PING => return InboundOutcome::Pong,
            PONG | KEEPALIVE_ACK => return InboundOutcome::KeepAliveAck,
            _ => {}
        }

        let mut sample = match parse_sample(text) {
            Ok(sample) => sample,
            Err(DomainError::InvalidPayload(reason)) => {
                warn!(%reason, "Rejecting malformed sample");
                return InboundOutcome::Rejected(reason);
            }
            Err(e) => {
                warn!(error = %e, "Rejecting sample");
                return InboundOutcome::Rejected(e.to_string());
            }
        };
        stamp_encounter(&mut sample, session_encounter_id);

        if let Err(e) = self.sink.append(&sample).await {
            // Persistence is best-effort from the pipeline's perspective;
            // a sink outage must not stop ingestion.
            error!(
                device = %sample.device,
                sensor_type = %sample.sensor_type,
                error = %e,
                "Failed to persist sample, continuing ingestion"
            );
        }

        let flushed = {
            let mut buffer = self.buffer.lock().await;
            buffer.append(sample);
            buffer.flush_due()
        };

        match flushed {
            Some(samples) => {
                let flushed = samples.len();
                let delivered = match self.router.broadcast(&samples).await {
                    Ok(delivered) => delivered,
                    Err(e) => {
                        error!(error = %e, "Broadcast failed after flush");
                        0
                    }
                };
                debug!(flushed, delivered, "Flushed sample buffer");
                InboundOutcome::Accepted { flushed, delivered }
            }
            None => InboundOutcome::Accepted {
                flushed: 0,
                delivered: 0,
            },
        }
    }

    /// Buffered samples awaiting the next flush window (diagnostics).
    pub async fn buffered_count(&self) -> usize {
        self.buffer.lock().await.buffered_count()
    }
}
