use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use station_feed::config::FeedConfig;
use station_feed::jcdecaux::JcDecauxClient;
use station_feed::provider::{LocalCacheProvider, RemoteProvider, StationProvider};
use station_feed::storage::{FileStore, save_snapshot};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("station_feed=info")),
        )
        .init();

    let config = match FeedConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    if config.api_key.is_none() {
        warn!("JCDECAUX_API_KEY not set. API calls will likely fail.");
    }

    let client = match JcDecauxClient::new(config.jcdecaux()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to create JCDecaux client");
            std::process::exit(1);
        }
    };

    let store = Arc::new(FileStore::new(&config.cache_path));

    let local = LocalCacheProvider::new(Arc::clone(&store), config.cache_max_age);
    let remote = RemoteProvider::new(client, config.poll.clone());

    // Persist every remote refresh so the next run can paint from cache.
    let snapshot_store = Arc::clone(&store);
    let _ = remote.events().on_stations(move |stations| {
        if let Err(e) = save_snapshot(snapshot_store.as_ref(), stations, None, Utc::now()) {
            warn!(error = %e, "failed to save station snapshot");
        }
    });

    let providers: Vec<Box<dyn StationProvider>> = vec![Box::new(local), Box::new(remote)];

    for provider in &providers {
        let name = provider.name().to_string();
        let events = provider.events();

        let n = name.clone();
        let _ = events.on_stations(move |stations| {
            let unknown = stations.iter().filter(|s| s.available_bikes.is_unknown()).count();
            info!(provider = %n, stations = stations.len(), unknown, "stations");
        });
        let n = name.clone();
        let _ = events.on_starred_station_ids(move |ids| {
            info!(provider = %n, starred = ids.len(), "starred stations");
        });
        let _ = events.on_error(|diagnostic| {
            warn!(provider = %diagnostic.provider, "{}", diagnostic.message);
        });
    }

    for provider in &providers {
        match provider.start() {
            Ok(()) => info!(provider = provider.name(), "started"),
            Err(e) => info!(provider = provider.name(), reason = %e, "not started"),
        }
    }

    info!(
        stations_url = %config.stations_url,
        cache = %store.path().display(),
        "station feed running, press Ctrl-C to stop"
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    for provider in &providers {
        provider.stop();
    }
    info!("stopped");
}
