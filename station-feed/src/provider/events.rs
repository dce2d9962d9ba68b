//! Event topics emitted by station providers.

use std::fmt;

use crate::domain::{Station, StationNumber};
use crate::events::{EventChannel, Subscription};

/// Topics every provider may emit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// An unordered list of stations.
    Stations,
    /// An unordered list of starred station numbers.
    StarredStationIds,
    /// A diagnostic about a failure the provider swallowed.
    Error,
}

impl Topic {
    /// Wire name of the topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Stations => "stations",
            Topic::StarredStationIds => "starred-stations-ids",
            Topic::Error => "error",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure a provider absorbed instead of emitting bad data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDiagnostic {
    /// Name of the provider that hit the failure.
    pub provider: String,
    pub message: String,
}

/// Payload of a provider event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Stations(Vec<Station>),
    StarredStationIds(Vec<StationNumber>),
    Error(ProviderDiagnostic),
}

impl ProviderEvent {
    /// The topic this payload belongs to.
    pub fn topic(&self) -> Topic {
        match self {
            ProviderEvent::Stations(_) => Topic::Stations,
            ProviderEvent::StarredStationIds(_) => Topic::StarredStationIds,
            ProviderEvent::Error(_) => Topic::Error,
        }
    }
}

/// The event channel owned by one provider.
///
/// Cloning shares the subscriber set, which is how a provider hands its
/// channel to a background job.
#[derive(Clone, Default)]
pub struct ProviderEvents {
    channel: EventChannel<Topic, ProviderEvent>,
}

impl ProviderEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to raw events on a topic.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        self.channel.subscribe(topic, handler)
    }

    /// Subscribe to `stations`.
    pub fn on_stations<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&[Station]) + Send + Sync + 'static,
    {
        self.subscribe(Topic::Stations, move |event| {
            if let ProviderEvent::Stations(stations) = event {
                handler(stations);
            }
        })
    }

    /// Subscribe to `starred-stations-ids`.
    pub fn on_starred_station_ids<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&[StationNumber]) + Send + Sync + 'static,
    {
        self.subscribe(Topic::StarredStationIds, move |event| {
            if let ProviderEvent::StarredStationIds(ids) = event {
                handler(ids);
            }
        })
    }

    /// Subscribe to `error`.
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ProviderDiagnostic) + Send + Sync + 'static,
    {
        self.subscribe(Topic::Error, move |event| {
            if let ProviderEvent::Error(diagnostic) = event {
                handler(diagnostic);
            }
        })
    }

    /// Emit an event on its own topic.
    pub fn emit(&self, event: ProviderEvent) {
        self.channel.emit(&event.topic(), &event);
    }

    pub(crate) fn emit_stations(&self, stations: Vec<Station>) {
        self.emit(ProviderEvent::Stations(stations));
    }

    pub(crate) fn emit_starred_station_ids(&self, ids: Vec<StationNumber>) {
        self.emit(ProviderEvent::StarredStationIds(ids));
    }

    pub(crate) fn emit_error(&self, provider: &str, message: impl Into<String>) {
        self.emit(ProviderEvent::Error(ProviderDiagnostic {
            provider: provider.to_string(),
            message: message.into(),
        }));
    }

    /// Number of handlers on a topic.
    pub fn handler_count(&self, topic: Topic) -> usize {
        self.channel.handler_count(&topic)
    }
}

impl fmt::Debug for ProviderEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEvents")
            .field("stations", &self.handler_count(Topic::Stations))
            .field("starred", &self.handler_count(Topic::StarredStationIds))
            .field("error", &self.handler_count(Topic::Error))
            .finish()
    }
}
