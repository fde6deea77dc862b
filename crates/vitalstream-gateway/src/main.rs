mod config;
mod telemetry;

use config::ServiceConfig;
use std::sync::Arc;
use std::time::Duration;
use telemetry::{init_telemetry, TelemetryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use vitalstream_domain::{
    EncounterService, InMemoryConnectionRegistry, InMemorySampleSink, IngestionConfig,
    IngestionService, JwtConfig, JwtTokenVerifier,
};
use vitalstream_fhir::{FhirClient, FhirConfig};
use vitalstream_ws::{run_ws_server, GatewayState, WsServerConfig};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(
        ws_host = %config.ws_host,
        ws_port = config.ws_port,
        fhir_base_url = %config.fhir_base_url,
        "Starting vitalstream gateway"
    );
    debug!("Configuration: {:?}", config);

    let clinical = match FhirClient::new(&FhirConfig {
        base_url: config.fhir_base_url.clone(),
        timeout_secs: config.fhir_timeout_secs,
    }) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to initialize FHIR client: {}", e);
            std::process::exit(1);
        }
    };

    let registry = Arc::new(InMemoryConnectionRegistry::new());
    let sink = Arc::new(InMemorySampleSink::new());
    let ingestion = Arc::new(IngestionService::new(
        sink,
        registry.clone(),
        IngestionConfig {
            downsample_target: config.downsample_target,
            flush_interval: Duration::from_millis(config.flush_interval_ms),
        },
    ));

    let state = GatewayState {
        ingestion,
        registry,
        encounters: Arc::new(EncounterService::new(clinical.clone())),
        clinical,
        verifier: Arc::new(JwtTokenVerifier::new(JwtConfig {
            secret: config.jwt_secret.clone(),
        })),
        keepalive_interval: Duration::from_secs(config.keepalive_interval_secs),
    };

    let shutdown_token = CancellationToken::new();

    // Spawn signal handler
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                signal_token.cancel();
            }
            Err(err) => {
                error!("Error setting up signal handler: {}", err);
            }
        }
    });

    // Also handle SIGTERM on Unix systems
    #[cfg(unix)]
    {
        let sigterm_token = shutdown_token.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("Received SIGTERM signal");
                    sigterm_token.cancel();
                }
                Err(err) => {
                    error!("Error setting up SIGTERM handler: {}", err);
                }
            }
        });
    }

    let server_config = WsServerConfig {
        host: config.ws_host.clone(),
        port: config.ws_port,
    };

    if let Err(e) = run_ws_server(server_config, state, shutdown_token).await {
        error!("Gateway exited with error: {:#}", e);
        std::process::exit(1);
    }

    info!("Gateway stopped");
}
