use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// One meter sample as stored by the reading collaborator.
///
/// Field names follow the stored item layout (`facilityId`, `powerKw`, ...).
/// Ingestion payloads that use snake_case names are accepted as well, and
/// the timestamp may arrive as unix seconds, a numeric string or RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(default, alias = "facility_id")]
    pub facility_id: String,
    #[serde(alias = "meter_id")]
    pub meter_id: String,
    /// Unix seconds.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: i64,
    #[serde(default)]
    pub voltage: f64,
    #[serde(default)]
    pub current: f64,
    #[serde(default, alias = "power_kw")]
    pub power_kw: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl Reading {
    pub fn new(
        facility_id: impl Into<String>,
        meter_id: impl Into<String>,
        timestamp: i64,
        voltage: f64,
        current: f64,
        power_kw: f64,
    ) -> Self {
        Self {
            facility_id: facility_id.into(),
            meter_id: meter_id.into(),
            timestamp,
            voltage,
            current,
            power_kw,
            status: None,
            temperature: None,
        }
    }

    /// Decode a raw ingestion payload.
    ///
    /// Payloads without a facility id are attributed to `default_facility`.
    pub fn from_payload(payload: &[u8], default_facility: &str) -> Result<Self, CoreError> {
        let mut reading: Reading = serde_json::from_slice(payload)?;
        if reading.facility_id.is_empty() {
            reading.facility_id = default_facility.to_string();
        }
        reading.validate()?;
        Ok(reading)
    }

    /// Key fields must be present before a reading is stored or evaluated.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.facility_id.is_empty() {
            return Err(CoreError::InvalidInput("reading is missing facilityId".into()));
        }
        if self.meter_id.is_empty() {
            return Err(CoreError::InvalidInput("reading is missing meterId".into()));
        }
        if self.timestamp == 0 {
            return Err(CoreError::InvalidInput("reading is missing timestamp".into()));
        }
        Ok(())
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Seconds(i64),
    Fractional(f64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match TimestampRepr::deserialize(deserializer)? {
        TimestampRepr::Seconds(s) => Ok(s),
        TimestampRepr::Fractional(f) if f.is_finite() => Ok(f.trunc() as i64),
        TimestampRepr::Fractional(f) => Err(D::Error::custom(format!("invalid timestamp {f}"))),
        TimestampRepr::Text(text) => {
            if let Ok(secs) = text.trim().parse::<i64>() {
                return Ok(secs);
            }
            DateTime::parse_from_rfc3339(text.trim())
                .map(|dt| dt.timestamp())
                .map_err(|e| D::Error::custom(format!("invalid timestamp {text:?}: {e}")))
        }
    }
}

/// Parse a `YYYY-MM-DD` day key.
pub fn parse_day(value: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| CoreError::InvalidDate {
        value: value.to_string(),
    })
}
