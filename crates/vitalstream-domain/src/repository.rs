use crate::error::DomainResult;
use crate::sample::Sample;
use async_trait::async_trait;

/// Durable append-only store of every validated sample.
/// Infrastructure decides the engine; the pipeline only appends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SampleSink: Send + Sync {
    async fn append(&self, sample: &Sample) -> DomainResult<()>;
}

/// Input for provisioning a recording session upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateEncounterInput {
    pub patient_id: String,
    pub display_name: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

/// External clinical-record capabilities consumed by the pipeline.
///
/// Every call carries the caller's bearer token; the store enforces
/// authorization, the pipeline only reacts to the outcome.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClinicalRecordStore: Send + Sync {
    /// Provision a new recording session, returning the upstream id.
    async fn create_encounter(
        &self,
        token: &str,
        input: CreateEncounterInput,
    ) -> DomainResult<String>;

    /// Resolve an external patient reference (e.g. a national id) to the
    /// canonical patient identity.
    async fn resolve_patient_by_external_ref(
        &self,
        token: &str,
        external_ref: &str,
    ) -> DomainResult<String>;

    /// Whether the token's holder may read this patient's record.
    async fn validate_patient_access(&self, token: &str, patient_id: &str) -> DomainResult<bool>;
}
