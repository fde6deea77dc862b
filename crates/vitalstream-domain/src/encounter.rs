use crate::repository::{ClinicalRecordStore, CreateEncounterInput};
use crate::sample::Sample;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of encounter resolution. `degraded` marks a locally synthesized
/// fallback id so the session can notify the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEncounter {
    pub encounter_id: String,
    pub degraded: bool,
}

/// Resolves or lazily provisions the recording session for a device stream.
///
/// An encounter id is always produced: a supplied id passes through
/// untouched, upstream creation is attempted otherwise, and any upstream
/// failure yields a deterministic `temp_<patient>_<epoch>` fallback so
/// streaming proceeds in degraded mode instead of stalling.
pub struct EncounterService {
    clinical: Arc<dyn ClinicalRecordStore>,
}

impl EncounterService {
    pub fn new(clinical: Arc<dyn ClinicalRecordStore>) -> Self {
        Self { clinical }
    }

    pub async fn resolve(
        &self,
        token: &str,
        patient_id: &str,
        supplied_encounter_id: Option<String>,
        display_name: &str,
    ) -> ResolvedEncounter {
        if let Some(encounter_id) = supplied_encounter_id.filter(|id| !id.is_empty()) {
            debug!(%encounter_id, "Using encounter id supplied by device");
            return ResolvedEncounter {
                encounter_id,
                degraded: false,
            };
        }

        let start_time = chrono::Utc::now();
        let input = CreateEncounterInput {
            patient_id: patient_id.to_string(),
            display_name: display_name.to_string(),
            start_time,
        };
        match self.clinical.create_encounter(token, input).await {
            Ok(encounter_id) => {
                info!(patient_id, %encounter_id, "Provisioned encounter upstream");
                ResolvedEncounter {
                    encounter_id,
                    degraded: false,
                }
            }
            Err(e) => {
                let encounter_id = format!("temp_{}_{}", patient_id, start_time.timestamp());
                warn!(
                    patient_id,
                    error = %e,
                    fallback = %encounter_id,
                    "Encounter creation failed, continuing with fallback id"
                );
                ResolvedEncounter {
                    encounter_id,
                    degraded: true,
                }
            }
        }
    }
}

/// Samples arriving without an encounter id inherit the session's resolved
/// one; an explicit id on the wire wins.
pub fn stamp_encounter(sample: &mut Sample, encounter_id: &str) {
    if sample.encounter_id.is_empty() {
        sample.encounter_id = encounter_id.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::repository::MockClinicalRecordStore;

    #[tokio::test]
    async fn test_supplied_encounter_id_passes_through() {
        let mut clinical = MockClinicalRecordStore::new();
        clinical.expect_create_encounter().times(0);

        let service = EncounterService::new(Arc::new(clinical));
        let resolved = service
            .resolve("tok", "p1", Some("enc-42".to_string()), "Dr. Who")
            .await;

        assert_eq!(resolved.encounter_id, "enc-42");
        assert!(!resolved.degraded);
    }

    #[tokio::test]
    async fn test_missing_id_provisions_upstream() {
        let mut clinical = MockClinicalRecordStore::new();
        clinical
            .expect_create_encounter()
            .withf(|token: &str, input: &CreateEncounterInput| {
                token == "tok" && input.patient_id == "p1"
            })
            .times(1)
            .return_once(|_, _| Ok("enc-upstream".to_string()));

        let service = EncounterService::new(Arc::new(clinical));
        let resolved = service.resolve("tok", "p1", None, "Dr. Who").await;

        assert_eq!(resolved.encounter_id, "enc-upstream");
        assert!(!resolved.degraded);
    }

    #[tokio::test]
    async fn test_upstream_failure_yields_temp_fallback() {
        let mut clinical = MockClinicalRecordStore::new();
        clinical
            .expect_create_encounter()
            .times(1)
            .return_once(|_, _| {
                Err(DomainError::ClinicalRecordError(
                    "upstream timed out".to_string(),
                ))
            });

        let service = EncounterService::new(Arc::new(clinical));
        let resolved = service.resolve("tok", "p1", None, "Dr. Who").await;

        assert!(resolved.degraded);
        assert!(resolved.encounter_id.starts_with("temp_p1_"));
        let epoch: i64 = resolved
            .encounter_id
            .trim_start_matches("temp_p1_")
            .parse()
            .expect("fallback suffix is an epoch timestamp");
        assert!(epoch > 1_700_000_000);
    }

    #[tokio::test]
    async fn test_empty_supplied_id_treated_as_missing() {
        let mut clinical = MockClinicalRecordStore::new();
        clinical
            .expect_create_encounter()
            .times(1)
            .return_once(|_, _| Ok("enc-upstream".to_string()));

        let service = EncounterService::new(Arc::new(clinical));
        let resolved = service
            .resolve("tok", "p1", Some(String::new()), "Dr. Who")
            .await;

        assert_eq!(resolved.encounter_id, "enc-upstream");
    }

    #[test]
    fn test_stamp_encounter_only_fills_blank() {
        let mut sample = Sample {
            device: "d1".to_string(),
            sensor_type: "hr".to_string(),
            value: 60.0,
            timestamp_epoch: 1_700_000_000,
            timestamp_millis: 0,
            patient_id: "p1".to_string(),
            encounter_id: String::new(),
        };
        stamp_encounter(&mut sample, "enc-1");
        assert_eq!(sample.encounter_id, "enc-1");

        sample.encounter_id = "enc-explicit".to_string();
        stamp_encounter(&mut sample, "enc-1");
        assert_eq!(sample.encounter_id, "enc-explicit");
    }
}
