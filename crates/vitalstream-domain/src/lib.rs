pub mod auth;
pub mod broadcast;
pub mod encounter;
pub mod error;
pub mod in_memory_registry;
pub mod in_memory_sink;
pub mod ingestion;
pub mod registry;
pub mod repository;
pub mod sample;
pub mod series_buffer;

pub use auth::{Identity, JwtClaims, JwtConfig, JwtTokenVerifier, TokenVerifier};
pub use broadcast::BroadcastRouter;
pub use encounter::{stamp_encounter, EncounterService, ResolvedEncounter};
pub use error::{DomainError, DomainResult};
pub use in_memory_registry::InMemoryConnectionRegistry;
pub use in_memory_sink::InMemorySampleSink;
pub use ingestion::{InboundOutcome, IngestionConfig, IngestionService};
pub use registry::{ConnectionRegistry, SessionId, SubscriberHandle};
pub use repository::{ClinicalRecordStore, CreateEncounterInput, SampleSink};
pub use sample::{parse_sample, Sample, SeriesKey};
pub use series_buffer::{downsample, SeriesBuffer};
