//! Provider backed by the local snapshot cache.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::domain::{Station, StationNumber};
use crate::storage::{KeyValueStore, LAST_UPDATE_KEY, STARRED_IDS_KEY, STATIONS_KEY};

use super::{ProviderEvents, StartError, StationProvider};

const NAME: &str = "LocalCacheProvider";

/// Emits the previously saved snapshot once, for an instant first paint.
///
/// Bike and stand counts go stale within minutes, so every emitted station
/// has them replaced by [`Availability::Unknown`](crate::domain::Availability)
/// until a fresher provider overwrites them. The rest of the record is
/// trusted as long as the snapshot is younger than `max_age`.
///
/// Nothing is scheduled, so `stop()` has nothing to do.
pub struct LocalCacheProvider<S> {
    store: S,
    max_age: TimeDelta,
    clock: Arc<dyn Clock>,
    events: ProviderEvents,
}

impl<S: KeyValueStore> LocalCacheProvider<S> {
    /// Create a provider that accepts snapshots up to `max_age` old.
    pub fn new(store: S, max_age: TimeDelta) -> Self {
        Self {
            store,
            max_age,
            clock: Arc::new(SystemClock),
            events: ProviderEvents::new(),
        }
    }

    /// Use a custom clock for the freshness check.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The freshness threshold.
    pub fn max_age(&self) -> TimeDelta {
        self.max_age
    }

    /// Read and validate the whole snapshot without emitting anything.
    fn load(&self) -> Result<(Vec<Station>, Vec<StationNumber>), StartError> {
        if !self.store.is_available() {
            return Err(StartError::StorageUnavailable);
        }

        let mut values = self
            .store
            .get_items(&[LAST_UPDATE_KEY, STATIONS_KEY, STARRED_IDS_KEY])?
            .into_iter();
        let last_update = values.next().flatten().ok_or(StartError::NotInitialized)?;
        let stations_json = values.next().flatten();
        let starred_json = values.next().flatten();

        let last_update = last_update
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| StartError::CorruptSnapshot {
                key: LAST_UPDATE_KEY,
                message: format!("not an epoch-millis timestamp: {last_update:?}"),
            })?;

        let age = self.clock.now() - last_update;
        if age > self.max_age {
            return Err(StartError::Stale {
                age,
                threshold: self.max_age,
            });
        }

        let stations_json = stations_json.ok_or_else(|| StartError::CorruptSnapshot {
            key: STATIONS_KEY,
            message: "missing".to_string(),
        })?;
        let mut stations: Vec<Station> = decode(STATIONS_KEY, &stations_json)?;
        for station in &mut stations {
            station.mark_volatile_unknown();
        }

        let starred = match starred_json {
            Some(json) => decode::<Option<Vec<StationNumber>>>(STARRED_IDS_KEY, &json)?
                .unwrap_or_default(),
            None => Vec::new(),
        };

        debug!(
            age_secs = age.num_seconds(),
            stations = stations.len(),
            starred = starred.len(),
            "loaded local snapshot"
        );

        Ok((stations, starred))
    }
}

fn decode<T: DeserializeOwned>(key: &'static str, json: &str) -> Result<T, StartError> {
    serde_json::from_str(json).map_err(|e| StartError::CorruptSnapshot {
        key,
        message: e.to_string(),
    })
}

impl<S: KeyValueStore> StationProvider for LocalCacheProvider<S> {
    fn name(&self) -> &str {
        NAME
    }

    fn events(&self) -> &ProviderEvents {
        &self.events
    }

    fn start(&self) -> Result<(), StartError> {
        let (stations, starred) = self.load()?;

        info!(
            provider = NAME,
            stations = stations.len(),
            "emitting cached stations"
        );
        self.events.emit_stations(stations);
        self.events.emit_starred_station_ids(starred);

        Ok(())
    }
}
