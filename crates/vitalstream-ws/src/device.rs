use crate::server::GatewayState;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vitalstream_domain::InboundOutcome;

/// RFC 6455 policy violation, sent when authentication fails pre-stream.
const POLICY_VIOLATION: u16 = 1008;

/// Outbound frames queued per session; a slow peer backpressures here.
const OUTBOUND_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    pub token: String,
    pub encounter_id: Option<String>,
    /// External patient reference (e.g. a national id) to resolve into the
    /// canonical patient identity.
    pub patient_ref: Option<String>,
}

pub async fn device_ws(
    State(state): State<GatewayState>,
    Query(query): Query<DeviceQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_device_socket(state, query, socket))
}

async fn handle_device_socket(state: GatewayState, query: DeviceQuery, mut socket: WebSocket) {
    // Authenticating: invalid token is fatal, close with policy violation.
    let identity = match state.verifier.verify(&query.token) {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "Rejecting device connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: POLICY_VIOLATION,
                    reason: "invalid token".into(),
                })))
                .await;
            return;
        }
    };

    // Patient resolution is best-effort: a failed lookup keeps the stream
    // alive and falls back to the raw reference for encounter provisioning.
    let patient_hint = match &query.patient_ref {
        Some(external_ref) => {
            match state
                .clinical
                .resolve_patient_by_external_ref(&query.token, external_ref)
                .await
            {
                Ok(patient_id) => patient_id,
                Err(e) => {
                    warn!(external_ref, error = %e, "Patient resolution failed");
                    let notice = format!("error: failed to resolve patient reference: {e}");
                    if socket.send(Message::Text(notice.into())).await.is_err() {
                        return;
                    }
                    external_ref.clone()
                }
            }
        }
        None => "unknown".to_string(),
    };

    // An encounter id is always announced before streaming starts.
    let resolved = state
        .encounters
        .resolve(
            &query.token,
            &patient_hint,
            query.encounter_id.clone(),
            &identity.subject,
        )
        .await;
    if resolved.degraded {
        let notice = "error: encounter provisioning degraded, using temporary id".to_string();
        if socket.send(Message::Text(notice.into())).await.is_err() {
            return;
        }
    }
    let announcement = format!("encounter_id: {}", resolved.encounter_id);
    if socket.send(Message::Text(announcement.into())).await.is_err() {
        return;
    }

    let session_id = match state.registry.register_device().await {
        Ok(session_id) => session_id,
        Err(e) => {
            warn!(error = %e, "Failed to register device session");
            return;
        }
    };
    info!(
        session_id,
        subject = %identity.subject,
        encounter_id = %resolved.encounter_id,
        "Device connected"
    );

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Single writer task; the receive loop and the keep-alive task both
    // queue frames through it.
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if ws_tx.send(message).await.is_err() {
                break;
            }
        }
    });

    let keepalive_token = CancellationToken::new();
    let keepalive = tokio::spawn(keepalive_loop(
        out_tx.clone(),
        state.keepalive_interval,
        keepalive_token.clone(),
    ));

    // Streaming: receive loop ends on peer disconnect or transport error.
    while let Some(next) = ws_rx.next().await {
        let message = match next {
            Ok(message) => message,
            Err(e) => {
                debug!(session_id, error = %e, "Device transport error");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                match state
                    .ingestion
                    .handle_text(text.as_str(), &resolved.encounter_id)
                    .await
                {
                    InboundOutcome::Pong => {
                        if out_tx.send(Message::Text("pong".into())).await.is_err() {
                            break;
                        }
                    }
                    InboundOutcome::KeepAliveAck => {}
                    InboundOutcome::Rejected(reason) => {
                        let notice = format!("error: {reason}");
                        if out_tx.send(Message::Text(notice.into())).await.is_err() {
                            break;
                        }
                    }
                    InboundOutcome::Accepted { flushed, delivered } => {
                        if flushed > 0 {
                            debug!(session_id, flushed, delivered, "Flush fired");
                        }
                    }
                }
            }
            Message::Close(_) => break,
            // Protocol-level ping/pong is answered by the library.
            _ => {}
        }
    }

    // Closing: keep-alive cancelled and session deregistered exactly once;
    // buffered samples stay until the next scheduled flush.
    keepalive_token.cancel();
    let _ = keepalive.await;
    drop(out_tx);
    let _ = writer.await;

    match state.registry.unregister_device(session_id).await {
        Ok(removed) => {
            if !removed {
                warn!(session_id, "Device session was already deregistered");
            }
        }
        Err(e) => warn!(session_id, error = %e, "Device deregistration failed"),
    }
    info!(session_id, "Device disconnected");
}

/// Periodic no-op frame defeating idle-connection timeouts in network
/// intermediaries. Exits silently on send failure instead of racing with
/// session teardown.
async fn keepalive_loop(
    sender: mpsc::Sender<Message>,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately; consume it so the cadence starts
    // one full period after connect.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if sender.send(Message::Text("keepalive".into())).await.is_err() {
                    break;
                }
            }
        }
    }
}
