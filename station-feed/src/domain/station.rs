//! The canonical station record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Availability;

/// Identifier of a station, stable across every provider.
///
/// Two records with the same number describe the same physical station and
/// can be merged field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationNumber(pub u32);

impl StationNumber {
    /// Returns the raw number.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for StationNumber {
    fn from(n: u32) -> Self {
        StationNumber(n)
    }
}

impl fmt::Display for StationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic position, independent of any source's lat/lng naming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Operating status of a station.
///
/// Sources are free to report statuses beyond `OPEN` and `CLOSED`; those are
/// kept verbatim in [`StationStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StationStatus {
    Open,
    Closed,
    Other(String),
}

impl StationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StationStatus::Open => "OPEN",
            StationStatus::Closed => "CLOSED",
            StationStatus::Other(s) => s,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, StationStatus::Open)
    }
}

impl From<String> for StationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "OPEN" => StationStatus::Open,
            "CLOSED" => StationStatus::Closed,
            _ => StationStatus::Other(s),
        }
    }
}

impl From<&str> for StationStatus {
    fn from(s: &str) -> Self {
        StationStatus::from(s.to_string())
    }
}

impl From<StationStatus> for String {
    fn from(status: StationStatus) -> Self {
        match status {
            StationStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bike-sharing station in the internal representation.
///
/// Every provider emits only this shape, whatever its source looks like.
/// The serialized form uses camelCase keys and is also the format of the
/// `stations` entry in the local key-value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub address: String,
    pub available_stands: Availability,
    pub available_bikes: Availability,
    /// Total capacity.
    pub bike_stands: u32,
    /// Has a payment terminal.
    pub banking: bool,
    pub bonus: bool,
    pub contract_name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_update: DateTime<Utc>,
    pub name: String,
    pub number: StationNumber,
    pub position: Position,
    pub status: StationStatus,
}

impl Station {
    /// Flag the fields that go stale fastest as unknown.
    pub fn mark_volatile_unknown(&mut self) {
        self.available_bikes = Availability::Unknown;
        self.available_stands = Availability::Unknown;
    }
}
