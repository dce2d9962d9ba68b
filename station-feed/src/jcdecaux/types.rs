//! JCDecaux OpenData response DTOs.
//!
//! These types map directly to the `/vls/v1/stations` JSON payload. Nothing
//! outside this module should depend on them; see `convert` for the mapping
//! into [`crate::domain::Station`].

use serde::{Deserialize, Serialize};

/// A station as returned by the JCDecaux API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawStation {
    pub address: String,
    pub available_bike_stands: u32,
    pub available_bikes: u32,
    pub bike_stands: u32,
    pub banking: bool,
    pub bonus: bool,
    pub contract_name: String,
    /// Epoch milliseconds.
    pub last_update: i64,
    pub name: String,
    pub number: u32,
    pub position: RawPosition,
    pub status: String,
}

/// Coordinates in the API's own naming.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RawPosition {
    pub lat: f64,
    pub lng: f64,
}
