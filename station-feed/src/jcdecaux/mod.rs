//! JCDecaux OpenData client.
//!
//! Fetches the raw station list of one contract (city) and converts it into
//! domain [`Station`](crate::domain::Station)s. Upstream field names such as
//! `available_bike_stands` or `position.lat` stop at this module boundary.

mod client;
mod convert;
mod error;
mod types;

pub use client::{DEFAULT_STATIONS_URL, JcDecauxClient, JcDecauxConfig};
pub use convert::{ConversionError, convert_station, convert_stations};
pub use error::FetchError;
pub use types::{RawPosition, RawStation};
