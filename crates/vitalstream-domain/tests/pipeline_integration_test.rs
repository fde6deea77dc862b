use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use vitalstream_domain::{
    ConnectionRegistry, InMemoryConnectionRegistry, InMemorySampleSink, InboundOutcome,
    IngestionConfig, IngestionService, Sample,
};

fn payload(value: f64) -> String {
    format!(
        r#"{{"device":"d1","sensor_type":"hr","value":{value},"timestamp_epoch":1700000000,"timestamp_millis":0,"patient_id":"p1","encounter_id":"e1"}}"#
    )
}

fn pipeline(
    flush_interval: Duration,
) -> (
    Arc<InMemorySampleSink>,
    Arc<InMemoryConnectionRegistry>,
    IngestionService,
) {
    let sink = Arc::new(InMemorySampleSink::new());
    let registry = Arc::new(InMemoryConnectionRegistry::new());
    let service = IngestionService::new(
        sink.clone(),
        registry.clone(),
        IngestionConfig {
            downsample_target: 2,
            flush_interval,
        },
    );
    (sink, registry, service)
}

async fn drain(rx: &mut mpsc::Receiver<Sample>) -> Vec<f64> {
    let mut values = Vec::new();
    while let Ok(sample) = rx.try_recv() {
        values.push(sample.value);
    }
    values
}

#[tokio::test]
async fn test_one_window_of_five_samples_downsamples_to_first_and_last() {
    let (sink, registry, service) = pipeline(Duration::from_millis(200));
    let (tx, mut rx) = mpsc::channel(16);
    registry.subscribe("p1", tx).await.unwrap();

    // Four samples land well inside the flush window.
    for value in [60.0, 61.0, 62.0, 63.0] {
        let outcome = service.handle_text(&payload(value), "e1").await;
        assert_eq!(
            outcome,
            InboundOutcome::Accepted {
                flushed: 0,
                delivered: 0
            }
        );
    }

    // The fifth arrives after the window elapses and triggers the flush.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let outcome = service.handle_text(&payload(64.0), "e1").await;
    assert_eq!(
        outcome,
        InboundOutcome::Accepted {
            flushed: 2,
            delivered: 2
        }
    );

    // n=5, k=2: step 2 picks indices 0 and 2, the last pick is forced to
    // the newest reading.
    assert_eq!(drain(&mut rx).await, vec![60.0, 64.0]);

    // Every sample was persisted regardless of downsampling.
    assert_eq!(sink.stored_count().await, 5);
    // The flush cleared the whole buffer.
    assert_eq!(service.buffered_count().await, 0);
}

#[tokio::test]
async fn test_fanout_reaches_every_watcher_of_the_patient() {
    let (_sink, registry, service) = pipeline(Duration::ZERO);

    let mut receivers = Vec::new();
    for _ in 0..3 {
        let (tx, rx) = mpsc::channel(16);
        registry.subscribe("p1", tx).await.unwrap();
        receivers.push(rx);
    }
    let (other_tx, mut other_rx) = mpsc::channel(16);
    registry.subscribe("p2", other_tx).await.unwrap();

    let outcome = service.handle_text(&payload(72.0), "e1").await;
    assert_eq!(
        outcome,
        InboundOutcome::Accepted {
            flushed: 1,
            delivered: 3
        }
    );

    for rx in receivers.iter_mut() {
        assert_eq!(drain(rx).await, vec![72.0]);
    }
    assert!(drain(&mut other_rx).await.is_empty());
}

#[tokio::test]
async fn test_malformed_messages_never_poison_the_stream() {
    let (sink, _registry, service) = pipeline(Duration::ZERO);

    for bad in [r#"{"device":1}"#, "not json", "{}"] {
        let outcome = service.handle_text(bad, "e1").await;
        assert!(matches!(outcome, InboundOutcome::Rejected(_)), "{bad}");
    }

    let outcome = service.handle_text(&payload(60.0), "e1").await;
    assert!(matches!(outcome, InboundOutcome::Accepted { .. }));
    assert_eq!(sink.stored_count().await, 1);
}

#[tokio::test]
async fn test_disconnected_subscriber_leaves_others_untouched() {
    let (_sink, registry, service) = pipeline(Duration::ZERO);

    let (gone_tx, gone_rx) = mpsc::channel(16);
    let (alive_tx, mut alive_rx) = mpsc::channel(16);
    registry.subscribe("p1", gone_tx).await.unwrap();
    registry.subscribe("p1", alive_tx).await.unwrap();

    // Simulate a monitor that went away without unsubscribing yet.
    drop(gone_rx);

    let outcome = service.handle_text(&payload(60.0), "e1").await;
    assert_eq!(
        outcome,
        InboundOutcome::Accepted {
            flushed: 1,
            delivered: 1
        }
    );
    assert_eq!(drain(&mut alive_rx).await, vec![60.0]);
}
