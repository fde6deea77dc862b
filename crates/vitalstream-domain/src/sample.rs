use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// One validated device reading. Immutable after parsing; the effective
/// timestamp is `timestamp_epoch + timestamp_millis / 1000`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Sample {
    #[garde(skip)]
    pub device: String,
    #[garde(skip)]
    pub sensor_type: String,
    #[garde(skip)]
    pub value: f64,
    #[garde(skip)]
    pub timestamp_epoch: i64,
    /// Sub-second offset of the reading, must stay within one second.
    #[garde(range(min = 0, max = 999))]
    pub timestamp_millis: i64,
    #[garde(skip)]
    pub patient_id: String,
    /// Missing on the wire when the device relies on the session's
    /// resolved encounter; stamped before buffering in that case.
    #[serde(default)]
    #[garde(skip)]
    pub encounter_id: String,
}

impl Sample {
    /// Key under which this sample is buffered: one series per
    /// (device, sensor kind) pair.
    pub fn series_key(&self) -> SeriesKey {
        SeriesKey {
            device: self.device.clone(),
            sensor_type: self.sensor_type.clone(),
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(
            self.timestamp_epoch,
            (self.timestamp_millis.clamp(0, 999) as u32) * 1_000_000,
        )
        .unwrap_or_default()
    }

    /// JSON payload pushed to monitoring clients, with a derived
    /// human-readable timestamp alongside the raw fields.
    pub fn broadcast_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "device": self.device,
            "sensor_type": self.sensor_type,
            "value": self.value,
            "timestamp_epoch": self.timestamp_epoch,
            "timestamp_millis": self.timestamp_millis,
            "datetime": self.occurred_at().to_rfc3339(),
            "patient_id": self.patient_id,
            "encounter_id": self.encounter_id,
        })
    }
}

/// Buffer key: one ordered series per (device, sensor kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub device: String,
    pub sensor_type: String,
}

/// Parse and validate one inbound device message.
///
/// Both schema mismatches (wrong types, missing fields) and range
/// violations surface as [`DomainError::InvalidPayload`] so the receive
/// loop can notify the peer and keep going.
pub fn parse_sample(text: &str) -> DomainResult<Sample> {
    let sample: Sample =
        serde_json::from_str(text).map_err(|e| DomainError::InvalidPayload(e.to_string()))?;
    sample
        .validate()
        .map_err(|report| DomainError::InvalidPayload(format_validation_errors(&report)))?;
    Ok(sample)
}

fn format_validation_errors(report: &garde::Report) -> String {
    report
        .iter()
        .map(|(path, error)| {
            if path.to_string().is_empty() {
                error.message().to_string()
            } else {
                format!("{}: {}", path, error.message())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
