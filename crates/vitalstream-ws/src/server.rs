use crate::{device, monitor};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vitalstream_domain::{
    ClinicalRecordStore, ConnectionRegistry, EncounterService, IngestionService, TokenVerifier,
};

/// WebSocket gateway configuration.
pub struct WsServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for WsServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8088,
        }
    }
}

/// Shared dependencies handed to every connection handler.
#[derive(Clone)]
pub struct GatewayState {
    pub ingestion: Arc<IngestionService>,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub encounters: Arc<EncounterService>,
    pub clinical: Arc<dyn ClinicalRecordStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub keepalive_interval: Duration,
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/sensor/device_ws", get(device::device_ws))
        .route("/sensor/monitor_ws", get(monitor::monitor_ws))
        .with_state(state)
}

/// Run the WebSocket gateway with graceful shutdown.
pub async fn run_ws_server(
    config: WsServerConfig,
    state: GatewayState,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Starting WebSocket gateway on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, build_router(state)).with_graceful_shutdown(async move {
        cancellation_token.cancelled().await;
        info!("WebSocket gateway shutdown signal received");
    });

    match server.await {
        Ok(_) => {
            info!("WebSocket gateway stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!("WebSocket gateway error: {}", e);
            Err(e.into())
        }
    }
}
