use crate::config::FhirConfig;
use crate::conversions::{encounter_resource, first_bundle_entry_id, resource_id};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use vitalstream_domain::{
    ClinicalRecordStore, CreateEncounterInput, DomainError, DomainResult,
};

/// HTTP client for the external clinical-record server.
///
/// Every call forwards the session's bearer token; the server enforces
/// authorization. Failures surface as DomainError and the pipeline decides
/// the degradation policy.
pub struct FhirClient {
    http: reqwest::Client,
    base_url: String,
}

impl FhirClient {
    pub fn new(config: &FhirConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ClinicalRecordStore for FhirClient {
    async fn create_encounter(
        &self,
        token: &str,
        input: CreateEncounterInput,
    ) -> DomainResult<String> {
        let url = format!("{}/Encounter", self.base_url);
        debug!(%url, patient_id = %input.patient_id, "Creating Encounter resource");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/fhir+json")
            .json(&encounter_resource(&input))
            .send()
            .await
            .map_err(|e| DomainError::ClinicalRecordError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "Encounter creation rejected upstream");
            return Err(DomainError::EncounterCreationFailed(format!(
                "upstream returned {status}"
            )));
        }

        let resource: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DomainError::ClinicalRecordError(e.to_string()))?;
        resource_id(&resource).ok_or_else(|| {
            DomainError::ClinicalRecordError("Encounter response missing id".to_string())
        })
    }

    async fn resolve_patient_by_external_ref(
        &self,
        token: &str,
        external_ref: &str,
    ) -> DomainResult<String> {
        let url = format!("{}/Patient", self.base_url);
        debug!(%url, external_ref, "Resolving patient by external reference");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("identifier", external_ref)])
            .send()
            .await
            .map_err(|e| DomainError::ClinicalRecordError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::ClinicalRecordError(format!(
                "Patient search returned {status}"
            )));
        }

        let bundle: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DomainError::ClinicalRecordError(e.to_string()))?;
        first_bundle_entry_id(&bundle)
            .ok_or_else(|| DomainError::PatientNotFound(external_ref.to_string()))
    }

    async fn validate_patient_access(&self, token: &str, patient_id: &str) -> DomainResult<bool> {
        let url = format!("{}/Patient/{}", self.base_url, patient_id);
        debug!(%url, "Validating patient access");

        // A readable Patient resource means the token's holder is
        // authorized for this patient; any HTTP error status means not.
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DomainError::ClinicalRecordError(e.to_string()))?;

        Ok(response.status().is_success())
    }
}
