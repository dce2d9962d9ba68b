//! Domain types for station data.
//!
//! Everything a provider emits is expressed in these types, so consumers
//! never see a source's own schema.

mod availability;
mod station;

pub use availability::{Availability, UNKNOWN_MARKER};
pub use station::{Position, Station, StationNumber, StationStatus};
