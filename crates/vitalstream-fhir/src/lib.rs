pub mod client;
pub mod config;
pub mod conversions;

pub use client::FhirClient;
pub use config::FhirConfig;
