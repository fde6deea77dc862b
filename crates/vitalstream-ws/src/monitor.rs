use crate::server::GatewayState;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vitalstream_domain::Sample;

const POLICY_VIOLATION: u16 = 1008;

/// Samples queued per monitor; a monitor that falls this far behind
/// starts missing samples rather than stalling the pipeline.
const SUBSCRIBER_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
pub struct MonitorQuery {
    pub token: String,
    pub patient_id: String,
}

pub async fn monitor_ws(
    State(state): State<GatewayState>,
    Query(query): Query<MonitorQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_monitor_socket(state, query, socket))
}

async fn handle_monitor_socket(state: GatewayState, query: MonitorQuery, mut socket: WebSocket) {
    if let Err(e) = state.verifier.verify(&query.token) {
        warn!(error = %e, "Rejecting monitor connection");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: POLICY_VIOLATION,
                reason: "invalid token".into(),
            })))
            .await;
        return;
    }

    // The monitor must be authorized for the patient it wants to watch.
    let authorized = state
        .clinical
        .validate_patient_access(&query.token, &query.patient_id)
        .await
        .unwrap_or(false);
    if !authorized {
        warn!(patient_id = %query.patient_id, "Monitor not authorized for patient");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: POLICY_VIOLATION,
                reason: "not authorized for patient".into(),
            })))
            .await;
        return;
    }

    let (sample_tx, mut sample_rx) = mpsc::channel::<Sample>(SUBSCRIBER_CAPACITY);
    let session_id = match state
        .registry
        .subscribe(&query.patient_id, sample_tx)
        .await
    {
        Ok(session_id) => session_id,
        Err(e) => {
            warn!(error = %e, "Failed to register monitor session");
            return;
        }
    };
    info!(session_id, patient_id = %query.patient_id, "Monitor connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            routed = sample_rx.recv() => match routed {
                Some(sample) => {
                    let payload = sample.broadcast_payload().to_string();
                    if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(other)) => {
                    // Monitors only listen; anything they send is dropped.
                    debug!(session_id, ?other, "Ignoring inbound monitor frame");
                }
                Some(Err(e)) => {
                    debug!(session_id, error = %e, "Monitor transport error");
                    break;
                }
            },
        }
    }

    match state
        .registry
        .unsubscribe(&query.patient_id, session_id)
        .await
    {
        Ok(removed) => {
            if !removed {
                warn!(session_id, "Monitor session was already removed");
            }
        }
        Err(e) => warn!(session_id, error = %e, "Monitor removal failed"),
    }
    info!(session_id, patient_id = %query.patient_id, "Monitor disconnected");
}
