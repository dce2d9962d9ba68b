//! Snapshot layout in the key-value store.

use chrono::{DateTime, Utc};

use crate::domain::{Station, StationNumber};

use super::{KeyValueStore, StorageError};

/// Epoch milliseconds of the last snapshot, as a decimal string.
pub const LAST_UPDATE_KEY: &str = "lastStationsUpdate";

/// JSON array of internal station records.
pub const STATIONS_KEY: &str = "stations";

/// JSON array of starred station numbers.
pub const STARRED_IDS_KEY: &str = "starred-stations-ids";

/// Write a snapshot of `stations` taken at `now`.
///
/// The starred list is only written when given, so a refresh of the station
/// list keeps whatever the user starred before.
pub fn save_snapshot<S: KeyValueStore + ?Sized>(
    store: &S,
    stations: &[Station],
    starred: Option<&[StationNumber]>,
    now: DateTime<Utc>,
) -> Result<(), StorageError> {
    let encoding = |e: serde_json::Error| StorageError::Encoding {
        message: e.to_string(),
    };

    let stations_json = serde_json::to_string(stations).map_err(encoding)?;
    let starred_json = starred
        .map(|ids| serde_json::to_string(ids).map_err(encoding))
        .transpose()?;

    let last_update = now.timestamp_millis().to_string();

    let mut items = vec![(STATIONS_KEY, stations_json.as_str())];
    if let Some(starred_json) = &starred_json {
        items.push((STARRED_IDS_KEY, starred_json.as_str()));
    }
    // Last, so a store that writes item by item never has a fresh timestamp
    // over half-written data.
    items.push((LAST_UPDATE_KEY, last_update.as_str()));

    store.set_items(&items)
}
