//! Availability counts that may be unknown.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire form of the unknown marker.
pub const UNKNOWN_MARKER: &str = "?";

/// A bike or stand count that may be flagged as stale.
///
/// Cached snapshots replace their volatile counts with [`Availability::Unknown`]
/// rather than dropping the field, so consumers can tell "no data yet" apart
/// from "zero bikes".
///
/// On the wire a known count is a plain JSON integer and the unknown marker is
/// the string `"?"`.
///
/// ```
/// use station_feed::domain::Availability;
///
/// let known: Availability = serde_json::from_str("3").unwrap();
/// assert_eq!(known, Availability::Known(3));
///
/// let unknown: Availability = serde_json::from_str("\"?\"").unwrap();
/// assert!(unknown.is_unknown());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Availability {
    /// A count reported by the source.
    Known(u32),
    /// The count is presumed stale.
    #[default]
    Unknown,
}

impl Availability {
    /// Returns the count if it is known.
    pub fn known(self) -> Option<u32> {
        match self {
            Availability::Known(n) => Some(n),
            Availability::Unknown => None,
        }
    }

    /// Whether this is the unknown marker.
    pub fn is_unknown(self) -> bool {
        matches!(self, Availability::Unknown)
    }
}

impl From<u32> for Availability {
    fn from(n: u32) -> Self {
        Availability::Known(n)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Known(n) => write!(f, "{n}"),
            Availability::Unknown => f.write_str(UNKNOWN_MARKER),
        }
    }
}

impl Serialize for Availability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Availability::Known(n) => serializer.serialize_u32(*n),
            Availability::Unknown => serializer.serialize_str(UNKNOWN_MARKER),
        }
    }
}

struct AvailabilityVisitor;

impl Visitor<'_> for AvailabilityVisitor {
    type Value = Availability;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a non-negative integer or \"{UNKNOWN_MARKER}\"")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Availability, E> {
        u32::try_from(v)
            .map(Availability::Known)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Availability, E> {
        u32::try_from(v)
            .map(Availability::Known)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Availability, E> {
        if v == UNKNOWN_MARKER {
            Ok(Availability::Unknown)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<Availability, E> {
        Ok(Availability::Unknown)
    }
}

impl<'de> Deserialize<'de> for Availability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AvailabilityVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_known_as_integer() {
        let json = serde_json::to_string(&Availability::Known(11)).unwrap();
        assert_eq!(json, "11");
    }

    #[test]
    fn serializes_unknown_as_marker() {
        let json = serde_json::to_string(&Availability::Unknown).unwrap();
        assert_eq!(json, "\"?\"");
    }

    #[test]
    fn null_reads_as_unknown() {
        let parsed: Availability = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, Availability::Unknown);
    }

    #[test]
    fn rejects_negative_and_other_strings() {
        assert!(serde_json::from_str::<Availability>("-1").is_err());
        assert!(serde_json::from_str::<Availability>("\"lots\"").is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Availability::Known(4).to_string(), "4");
        assert_eq!(Availability::Unknown.to_string(), "?");
    }
}
