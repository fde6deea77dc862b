use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // WebSocket gateway configuration
    /// WebSocket server host
    #[serde(default = "default_ws_host")]
    pub ws_host: String,

    /// WebSocket server port
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// Seconds between keep-alive frames sent to connected devices
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    // Ingestion pipeline configuration
    /// Minimum milliseconds between buffer flushes
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Samples kept per series on each flush
    #[serde(default = "default_downsample_target")]
    pub downsample_target: usize,

    // FHIR configuration
    /// Base URL of the FHIR server
    #[serde(default = "default_fhir_base_url")]
    pub fhir_base_url: String,

    /// HTTP timeout for FHIR requests in seconds
    #[serde(default = "default_fhir_timeout_secs")]
    pub fhir_timeout_secs: u64,

    // JWT configuration
    /// JWT signing secret (required for production)
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

// WebSocket defaults
fn default_ws_host() -> String {
    "0.0.0.0".to_string()
}

fn default_ws_port() -> u16 {
    8088
}

fn default_keepalive_interval_secs() -> u64 {
    2
}

// Pipeline defaults
fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_downsample_target() -> usize {
    2
}

// FHIR defaults
fn default_fhir_base_url() -> String {
    "http://localhost:8080/fhir".to_string()
}

fn default_fhir_timeout_secs() -> u64 {
    50
}

// JWT defaults
fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("VITALSTREAM"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        // Clear any existing VITALSTREAM_ environment variables
        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::remove_var("VITALSTREAM_LOG_LEVEL");
            std::env::remove_var("VITALSTREAM_WS_PORT");
            std::env::remove_var("VITALSTREAM_KEEPALIVE_INTERVAL_SECS");
        }

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.ws_port, 8088);
        assert_eq!(config.flush_interval_ms, 1000);
        assert_eq!(config.downsample_target, 2);
        // Keep-alives must fire on a short cadence to defeat
        // idle-connection timeouts in network intermediaries.
        assert_eq!(config.keepalive_interval_secs, 2);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("VITALSTREAM_LOG_LEVEL", "debug");
            std::env::set_var("VITALSTREAM_WS_PORT", "9099");
        }

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.ws_port, 9099);

        // Clean up
        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::remove_var("VITALSTREAM_LOG_LEVEL");
            std::env::remove_var("VITALSTREAM_WS_PORT");
        }
    }
}
