//! Conversion from JCDecaux DTOs to domain types.
//!
//! The rest of the crate never sees the API's field names. If the upstream
//! schema changes, or another operator's API is added, only this module and
//! `types` need to follow.

use chrono::DateTime;
use tracing::warn;

use crate::domain::{Availability, Position, Station, StationNumber, StationStatus};

use super::types::RawStation;

/// Error converting a single raw station.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// `last_update` is outside the representable date range
    #[error("invalid last_update timestamp: {0}")]
    InvalidTimestamp(i64),
}

/// Convert one raw station into the internal representation.
pub fn convert_station(raw: RawStation) -> Result<Station, ConversionError> {
    let last_update = DateTime::from_timestamp_millis(raw.last_update)
        .ok_or(ConversionError::InvalidTimestamp(raw.last_update))?;

    Ok(Station {
        address: raw.address,
        available_stands: Availability::Known(raw.available_bike_stands),
        available_bikes: Availability::Known(raw.available_bikes),
        bike_stands: raw.bike_stands,
        banking: raw.banking,
        bonus: raw.bonus,
        contract_name: raw.contract_name,
        last_update,
        name: raw.name,
        number: StationNumber(raw.number),
        position: Position::new(raw.position.lat, raw.position.lng),
        status: StationStatus::from(raw.status),
    })
}

/// Convert a full API response.
///
/// Stations that fail conversion are logged and skipped rather than failing
/// the whole batch.
pub fn convert_stations(raw: Vec<RawStation>) -> Vec<Station> {
    let mut stations = Vec::with_capacity(raw.len());

    for item in raw {
        let number = item.number;
        match convert_station(item) {
            Ok(station) => stations.push(station),
            Err(e) => warn!(station = number, error = %e, "skipping station"),
        }
    }

    stations
}
