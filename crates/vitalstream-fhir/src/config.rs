/// Connection settings for the FHIR-style clinical-record server.
#[derive(Debug, Clone)]
pub struct FhirConfig {
    /// Base URL of the server, e.g. `http://localhost:8080/fhir`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FhirConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/fhir".to_string(),
            timeout_secs: 50,
        }
    }
}
