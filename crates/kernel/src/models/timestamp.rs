//! Timestamp decoding and document formatting.
//!
//! `row_to_json` renders `timestamp` columns without an offset and
//! `timestamptz` columns with one; both are read as UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::catalog::temporal::parse_timestamp;

/// Document timestamp pattern, microsecond precision with a literal `Z`.
pub const DOCUMENT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format a timestamp for a produced document.
pub fn format(value: &DateTime<Utc>) -> String {
    value.format(DOCUMENT_FORMAT).to_string()
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse_timestamp(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
