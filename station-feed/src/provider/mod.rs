//! Station providers.
//!
//! A provider is any source of station data: the JCDecaux API, the local
//! snapshot cache, or a fixed fixture set. Consumers depend only on the
//! [`StationProvider`] trait: subscribe to the provider's events, call
//! [`start`](StationProvider::start), and later [`stop`](StationProvider::stop).
//!
//! Providers never cache or merge anything themselves. They emit as soon as
//! they have data, which cannot happen before `start()` has been called.

mod error;
mod events;
mod fixture;
mod local;
mod remote;

pub use error::StartError;
pub use events::{ProviderDiagnostic, ProviderEvent, ProviderEvents, Topic};
pub use fixture::{FixtureProvider, reference_stations};
pub use local::LocalCacheProvider;
pub use remote::{PollConfig, RemoteProvider, StationSource};

/// The lifecycle and event contract shared by every provider.
pub trait StationProvider: Send + Sync {
    /// Stable identifier used in diagnostics.
    fn name(&self) -> &str;

    /// The provider's event channel.
    fn events(&self) -> &ProviderEvents;

    /// Start producing data.
    ///
    /// Only synchronous preconditions are reported here. `Ok(())` does not
    /// mean data will ever be emitted.
    fn start(&self) -> Result<(), StartError>;

    /// Stop producing data.
    ///
    /// Idempotent, and safe to call whether or not `start()` was called.
    fn stop(&self) {}
}
