use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid sample payload: {0}")]
    InvalidPayload(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Encounter creation failed: {0}")]
    EncounterCreationFailed(String),

    #[error("Clinical record error: {0}")]
    ClinicalRecordError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("External error: {0}")]
    ExternalError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
