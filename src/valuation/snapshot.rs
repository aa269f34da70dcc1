use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::format::NOT_AVAILABLE;

/// Point-in-time summary of a portfolio, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Uppercase settlement currency code, e.g. "USD".
    pub currency: String,
    #[serde(with = "snapshot_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub assets: Vec<SnapshotEntry>,
}

impl SnapshotDocument {
    /// Sum of the entry totals, clamped at `Decimal::MAX`.
    pub fn total_value(&self) -> Decimal {
        super::saturating_sum(self.assets.iter().map(|entry| entry.total_value))
    }

    /// File name (without directory) for this snapshot,
    /// e.g. `portfolio_snapshot_20240115_093000.json`.
    pub fn file_name(&self) -> String {
        format!(
            "portfolio_snapshot_{}.json",
            self.timestamp.format("%Y%m%d_%H%M%S")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub price: SnapshotPrice,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_value: Decimal,
}

/// A price as written to a snapshot: a JSON number, or the `"N/A"` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPrice {
    Available(Decimal),
    Unavailable,
}

impl SnapshotPrice {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            SnapshotPrice::Available(price) => Some(*price),
            SnapshotPrice::Unavailable => None,
        }
    }
}

impl From<Option<Decimal>> for SnapshotPrice {
    fn from(value: Option<Decimal>) -> Self {
        match value {
            Some(price) => SnapshotPrice::Available(price),
            None => SnapshotPrice::Unavailable,
        }
    }
}

impl Serialize for SnapshotPrice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SnapshotPrice::Available(price) => rust_decimal::serde::float::serialize(price, serializer),
            SnapshotPrice::Unavailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for SnapshotPrice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(#[serde(with = "rust_decimal::serde::float")] Decimal),
            Marker(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(price) => Ok(SnapshotPrice::Available(price)),
            Raw::Marker(marker) if marker == NOT_AVAILABLE => Ok(SnapshotPrice::Unavailable),
            Raw::Marker(other) => Err(serde::de::Error::custom(format!(
                "expected a number or {NOT_AVAILABLE:?}, got {other:?}"
            ))),
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS` timestamps.
mod snapshot_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
