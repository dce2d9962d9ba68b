//! Fixed in-memory provider for tests and demos.

use chrono::DateTime;

use crate::domain::{Availability, Position, Station, StationNumber, StationStatus};

use super::{ProviderEvents, StartError, StationProvider};

const NAME: &str = "FixtureProvider";

/// Epoch millis shared by the reference stations.
const FIXTURE_LAST_UPDATE_MS: i64 = 1_425_980_217_000;

/// Emits a deterministic dataset as soon as it is started.
///
/// By default only the starred list (every fixture station, in declared
/// order) is emitted; station emission must be switched on with
/// [`with_station_emission`](Self::with_station_emission).
pub struct FixtureProvider {
    stations: Vec<Station>,
    emit_stations: bool,
    events: ProviderEvents,
}

impl FixtureProvider {
    /// Provider over the two reference Paris stations.
    pub fn new() -> Self {
        Self::with_stations(reference_stations())
    }

    /// Provider over a custom dataset.
    pub fn with_stations(stations: Vec<Station>) -> Self {
        Self {
            stations,
            emit_stations: false,
            events: ProviderEvents::new(),
        }
    }

    /// Also emit `stations` on start.
    pub fn with_station_emission(mut self, enabled: bool) -> Self {
        self.emit_stations = enabled;
        self
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    fn starred_ids(&self) -> Vec<StationNumber> {
        self.stations.iter().map(|s| s.number).collect()
    }
}

impl Default for FixtureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StationProvider for FixtureProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn events(&self) -> &ProviderEvents {
        &self.events
    }

    fn start(&self) -> Result<(), StartError> {
        if self.emit_stations {
            self.events.emit_stations(self.stations.clone());
        }
        self.events.emit_starred_station_ids(self.starred_ids());
        Ok(())
    }
}

/// The reference dataset: stations 31705 and 101 of the Paris contract.
pub fn reference_stations() -> Vec<Station> {
    let last_update = DateTime::from_timestamp_millis(FIXTURE_LAST_UPDATE_MS).unwrap_or_default();

    vec![
        Station {
            address: "RUE DES CHAMPEAUX (PRES DE LA GARE ROUTIERE) - 93170 BAGNOLET".to_string(),
            available_stands: Availability::Known(38),
            available_bikes: Availability::Known(11),
            bike_stands: 50,
            banking: true,
            bonus: false,
            contract_name: "Paris".to_string(),
            last_update,
            name: "31705 - CHAMPEAUX (BAGNOLET)".to_string(),
            number: StationNumber(31705),
            position: Position::new(48.8645278209514, 2.416170724425901),
            status: StationStatus::Open,
        },
        Station {
            address: "RUE ERASME".to_string(),
            available_stands: Availability::Known(23),
            available_bikes: Availability::Known(2),
            bike_stands: 25,
            banking: true,
            bonus: true,
            contract_name: "Paris".to_string(),
            last_update,
            name: "RUE ERASME".to_string(),
            number: StationNumber(101),
            position: Position::new(48.842206, 2.345169),
            status: StationStatus::Open,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderEvent, Topic};
    use std::sync::{Arc, Mutex};

    fn record_all(events: &ProviderEvents) -> Arc<Mutex<Vec<ProviderEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for topic in [Topic::Stations, Topic::StarredStationIds] {
            let log = Arc::clone(&log);
            let _ = events.subscribe(topic, move |e| log.lock().unwrap().push(e.clone()));
        }
        log
    }

    #[test]
    fn emits_starred_ids_in_declared_order_only() {
        let provider = FixtureProvider::new();
        let log = record_all(provider.events());

        provider.start().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![ProviderEvent::StarredStationIds(vec![
                StationNumber(31705),
                StationNumber(101)
            ])]
        );
    }

    #[test]
    fn station_emission_can_be_enabled() {
        let provider = FixtureProvider::new().with_station_emission(true);
        let log = record_all(provider.events());

        provider.start().unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].topic(), Topic::Stations);
        assert_eq!(log[1].topic(), Topic::StarredStationIds);
        let ProviderEvent::Stations(stations) = &log[0] else {
            panic!("expected stations");
        };
        assert_eq!(stations, &reference_stations());
    }

    #[test]
    fn custom_dataset() {
        let mut stations = reference_stations();
        stations.truncate(1);
        let provider = FixtureProvider::with_stations(stations);
        let log = record_all(provider.events());

        provider.start().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![ProviderEvent::StarredStationIds(vec![StationNumber(31705)])]
        );
    }

    #[test]
    fn stop_is_a_no_op() {
        let provider = FixtureProvider::default();
        provider.stop();
        provider.start().unwrap();
        provider.stop();
        provider.stop();
        assert_eq!(provider.name(), "FixtureProvider");
    }

    #[test]
    fn reference_data() {
        let stations = reference_stations();
        assert_eq!(stations[0].last_update.timestamp_millis(), 1_425_980_217_000);
        assert!(stations[1].bonus);
    }
}
