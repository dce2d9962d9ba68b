//! Provider that polls a remote station API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::jcdecaux::{FetchError, JcDecauxClient, RawStation, convert_stations};

use super::{ProviderEvents, StartError, StationProvider};

const NAME: &str = "RemoteProvider";

/// Delay before the first fetch.
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Time between fetches when polling repeats.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// A network source of raw station records.
///
/// This abstraction lets the provider run against a fake in tests.
pub trait StationSource: Send + Sync + 'static {
    /// Fetch the full raw station list.
    fn fetch_stations(
        &self,
    ) -> impl Future<Output = Result<Vec<RawStation>, FetchError>> + Send;
}

impl StationSource for JcDecauxClient {
    async fn fetch_stations(&self) -> Result<Vec<RawStation>, FetchError> {
        self.fetch_all().await
    }
}

/// Scheduling of the remote fetch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait before the first fetch.
    pub initial_delay: Duration,
    /// Wait between fetches.
    pub interval: Duration,
    /// Whether to keep fetching after the first one.
    pub repeat: bool,
}

impl PollConfig {
    /// Fetch once after the initial delay, then stop.
    pub fn once() -> Self {
        Self {
            repeat: false,
            ..Self::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            interval: DEFAULT_POLL_INTERVAL,
            repeat: true,
        }
    }
}

/// Periodically fetches stations from a [`StationSource`] and emits them,
/// translated, on `stations`.
///
/// Each instance owns at most one background job. Fetches run one after the
/// other inside that job, so two requests are never in flight at once; a
/// fetch slower than the interval just delays the next tick.
///
/// Transport and decode failures never produce a `stations` event. They are
/// logged and reported on the `error` topic, and the next tick tries again.
///
/// `stop()` aborts the job and bumps a generation counter that the job checks
/// right before emitting, so a response arriving after `stop()` is dropped.
/// The check and the emit happen under an emit gate that `stop()` waits
/// on, so once `stop()` returns no handler will be called again.
pub struct RemoteProvider<S> {
    source: Arc<S>,
    config: PollConfig,
    events: ProviderEvents,
    job: Mutex<Option<JoinHandle<()>>>,
    generation: Arc<AtomicU64>,
    gate: Arc<EmitGate>,
}

impl<S: StationSource> RemoteProvider<S> {
    pub fn new(source: S, config: PollConfig) -> Self {
        Self::from_shared(Arc::new(source), config)
    }

    /// Create a provider over a source that is also used elsewhere.
    pub fn from_shared(source: Arc<S>, config: PollConfig) -> Self {
        Self {
            source,
            config,
            events: ProviderEvents::new(),
            job: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            gate: Arc::new(EmitGate::default()),
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Whether a fetch job is currently scheduled or running.
    pub fn is_running(&self) -> bool {
        self.job().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn job(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        lock(&self.job)
    }
}

impl<S: StationSource> StationProvider for RemoteProvider<S> {
    fn name(&self) -> &str {
        NAME
    }

    fn events(&self) -> &ProviderEvents {
        &self.events
    }

    fn start(&self) -> Result<(), StartError> {
        if self.config.repeat && self.config.interval.is_zero() {
            return Err(StartError::InvalidPollInterval);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StartError::NoRuntime)?;

        let mut job = self.job();
        if job.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!(provider = NAME, "fetch job already scheduled");
            return Ok(());
        }

        let task = PollTask {
            source: Arc::clone(&self.source),
            events: self.events.clone(),
            generation: Arc::clone(&self.generation),
            gate: Arc::clone(&self.gate),
            started_in: self.generation.load(Ordering::SeqCst),
            config: self.config.clone(),
        };
        *job = Some(runtime.spawn(task.run()));

        debug!(
            provider = NAME,
            initial_delay_ms = self.config.initial_delay.as_millis() as u64,
            interval_secs = self.config.interval.as_secs(),
            repeat = self.config.repeat,
            "scheduled fetch job"
        );
        Ok(())
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.job().take() {
            handle.abort();
            debug!(provider = NAME, "fetch job cancelled");
        }
        // An emit that passed its generation check before the bump may still
        // be running on another thread.
        self.gate.wait();
    }
}

impl<S> Drop for RemoteProvider<S> {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let job = self.job.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = job.take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializes the job's last cancellation check and its emit against `stop()`.
#[derive(Default)]
struct EmitGate {
    lock: Mutex<()>,
    /// Thread currently emitting, so a handler calling `stop()` does not wait
    /// on itself.
    holder: Mutex<Option<ThreadId>>,
}

impl EmitGate {
    fn enter(&self) -> EmitGuard<'_> {
        let guard = lock(&self.lock);
        *lock(&self.holder) = Some(thread::current().id());
        EmitGuard {
            gate: self,
            _lock: guard,
        }
    }

    /// Block until no emit is in progress, unless the caller is the emitter.
    fn wait(&self) {
        if *lock(&self.holder) == Some(thread::current().id()) {
            return;
        }
        drop(lock(&self.lock));
    }
}

struct EmitGuard<'a> {
    gate: &'a EmitGate,
    _lock: MutexGuard<'a, ()>,
}

impl Drop for EmitGuard<'_> {
    fn drop(&mut self) {
        // Runs before `_lock` is released.
        *lock(&self.gate.holder) = None;
    }
}

/// State moved into the background job.
struct PollTask<S> {
    source: Arc<S>,
    events: ProviderEvents,
    generation: Arc<AtomicU64>,
    gate: Arc<EmitGate>,
    /// Generation at the time the job was scheduled.
    started_in: u64,
    config: PollConfig,
}

impl<S: StationSource> PollTask<S> {
    async fn run(self) {
        tokio::time::sleep(self.config.initial_delay).await;

        if !self.config.repeat {
            self.poll_once().await;
            return;
        }

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            // First tick completes immediately.
            interval.tick().await;
            if self.is_cancelled() {
                return;
            }
            self.poll_once().await;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.started_in
    }

    async fn poll_once(&self) {
        match self.source.fetch_stations().await {
            Ok(raw) => {
                let stations = convert_stations(raw);
                let _emit = self.gate.enter();
                if self.is_cancelled() {
                    debug!(provider = NAME, "discarding result of cancelled fetch");
                    return;
                }
                info!(provider = NAME, stations = stations.len(), "fetched stations");
                self.events.emit_stations(stations);
            }
            Err(e) => {
                let _emit = self.gate.enter();
                if self.is_cancelled() {
                    debug!(provider = NAME, error = %e, "discarding error of cancelled fetch");
                    return;
                }
                warn!(provider = NAME, error = %e, "station fetch failed");
                self.events.emit_error(NAME, e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Availability, Position, Station, StationNumber};
    use crate::jcdecaux::RawPosition;
    use crate::provider::ProviderDiagnostic;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    fn raw(number: u32, available_bikes: u32, lat: f64, lng: f64) -> RawStation {
        RawStation {
            address: "RUE ERASME".to_string(),
            available_bike_stands: 23,
            available_bikes,
            bike_stands: 25,
            banking: true,
            bonus: true,
            contract_name: "Paris".to_string(),
            last_update: 1_425_980_217_000,
            name: "RUE ERASME".to_string(),
            number,
            position: RawPosition { lat, lng },
            status: "OPEN".to_string(),
        }
    }

    /// Scripted source that records how it is called.
    #[derive(Default)]
    struct FakeSource {
        responses: Mutex<VecDeque<Result<Vec<RawStation>, FetchError>>>,
        latency: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn with_latency(latency: Duration) -> Self {
            Self {
                latency,
                ..Self::default()
            }
        }

        fn push(&self, response: Result<Vec<RawStation>, FetchError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StationSource for FakeSource {
        async fn fetch_stations(&self) -> Result<Vec<RawStation>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(vec![raw(1, 1, 48.0, 2.0)]))
        }
    }

    struct Recorded {
        stations: Arc<Mutex<Vec<Vec<Station>>>>,
        errors: Arc<Mutex<Vec<ProviderDiagnostic>>>,
    }

    fn record(events: &ProviderEvents) -> Recorded {
        let stations = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&stations);
        let _ = events.on_stations(move |batch| s.lock().unwrap().push(batch.to_vec()));
        let e = Arc::clone(&errors);
        let _ = events.on_error(move |d| e.lock().unwrap().push(d.clone()));

        Recorded { stations, errors }
    }

    fn config() -> PollConfig {
        PollConfig::default()
            .with_initial_delay(Duration::from_secs(1))
            .with_interval(Duration::from_secs(60))
    }

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    #[tokio::test(start_paused = true)]
    async fn emits_translated_stations_after_initial_delay() {
        let source = Arc::new(FakeSource::default());
        source.push(Ok(vec![raw(5, 3, 48.8, 2.3)]));
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config().with_repeat(false));
        let recorded = record(provider.events());

        provider.start().unwrap();
        advance(Duration::from_millis(500)).await;
        assert_eq!(source.calls(), 0);

        advance(Duration::from_millis(600)).await;
        let batches = recorded.stations.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let station = &batches[0][0];
        assert_eq!(station.number, StationNumber(5));
        assert_eq!(station.available_bikes, Availability::Known(3));
        assert_eq!(station.position, Position::new(48.8, 2.3));
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_at_interval() {
        let source = Arc::new(FakeSource::default());
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config());
        let recorded = record(provider.events());

        provider.start().unwrap();
        // t = 1s, 61s, 121s
        advance(Duration::from_secs(150)).await;

        assert_eq!(source.calls(), 3);
        assert_eq!(recorded.stations.lock().unwrap().len(), 3);
        provider.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn single_shot_fetches_once() {
        let source = Arc::new(FakeSource::default());
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config().with_repeat(false));

        provider.start().unwrap();
        advance(Duration::from_secs(600)).await;

        assert_eq!(source.calls(), 1);
        assert!(!provider.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_right_after_start_prevents_emission() {
        let source = Arc::new(FakeSource::default());
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config());
        let recorded = record(provider.events());

        provider.start().unwrap();
        provider.stop();
        advance(Duration::from_secs(600)).await;

        assert_eq!(source.calls(), 0);
        assert!(recorded.stations.lock().unwrap().is_empty());
        assert!(!provider.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_fetch_discards_result() {
        let source = Arc::new(FakeSource::with_latency(Duration::from_secs(10)));
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config());
        let recorded = record(provider.events());

        provider.start().unwrap();
        advance(Duration::from_secs(2)).await;
        assert_eq!(source.calls(), 1);

        provider.stop();
        advance(Duration::from_secs(600)).await;

        assert_eq!(source.calls(), 1);
        assert!(recorded.stations.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn never_overlaps_fetches() {
        // Each fetch outlasts the interval.
        let source = Arc::new(FakeSource::with_latency(Duration::from_secs(90)));
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config());

        provider.start().unwrap();
        advance(Duration::from_secs(600)).await;
        provider.stop();

        assert!(source.calls() >= 2);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_schedules_one_job() {
        let source = Arc::new(FakeSource::default());
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config());

        provider.start().unwrap();
        provider.start().unwrap();
        advance(Duration::from_secs(30)).await;

        assert_eq!(source.calls(), 1);
        provider.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_stop_reschedules() {
        let source = Arc::new(FakeSource::default());
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config());
        let recorded = record(provider.events());

        provider.start().unwrap();
        provider.stop();
        provider.start().unwrap();
        advance(Duration::from_secs(2)).await;

        assert!(provider.is_running());
        assert_eq!(recorded.stations.lock().unwrap().len(), 1);
        provider.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_reports_error_and_keeps_polling() {
        let source = Arc::new(FakeSource::default());
        source.push(Err(FetchError::Api {
            status: 503,
            message: "down".into(),
        }));
        let provider = RemoteProvider::from_shared(Arc::clone(&source), config());
        let recorded = record(provider.events());

        provider.start().unwrap();
        advance(Duration::from_secs(2)).await;

        assert!(recorded.stations.lock().unwrap().is_empty());
        {
            let errors = recorded.errors.lock().unwrap();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].provider, "RemoteProvider");
            assert_eq!(errors[0].message, "API error 503: down");
        }

        advance(Duration::from_secs(60)).await;
        assert_eq!(recorded.stations.lock().unwrap().len(), 1);
        provider.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let provider = RemoteProvider::new(FakeSource::default(), config());
        provider.stop();
        provider.stop();
        assert!(!provider.is_running());

        provider.start().unwrap();
        provider.stop();
        provider.stop();
        assert!(!provider.is_running());
    }

    /// Returns a large batch straight away and flags when it has done so.
    struct BulkSource {
        size: u32,
        fetched: AtomicBool,
    }

    impl StationSource for BulkSource {
        async fn fetch_stations(&self) -> Result<Vec<RawStation>, FetchError> {
            let batch = (0..self.size).map(|n| raw(n, 1, 48.0, 2.0)).collect();
            self.fetched.store(true, Ordering::SeqCst);
            Ok(batch)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn nothing_is_emitted_once_stop_returns() {
        let source = Arc::new(BulkSource {
            size: 200_000,
            fetched: AtomicBool::new(false),
        });
        let provider = RemoteProvider::from_shared(
            Arc::clone(&source),
            PollConfig::once().with_initial_delay(Duration::ZERO),
        );

        let stopped = Arc::new(AtomicBool::new(false));
        let late = Arc::new(AtomicUsize::new(0));
        {
            let stopped = Arc::clone(&stopped);
            let late = Arc::clone(&late);
            let _ = provider.events().on_stations(move |_| {
                if stopped.load(Ordering::SeqCst) {
                    late.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        provider.start().unwrap();
        // Translation of the batch is still running on a worker thread.
        while !source.fetched.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        provider.stop();
        stopped.store(true, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(late.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn handler_can_stop_its_own_provider() {
        let source = Arc::new(FakeSource::default());
        let provider = Arc::new(RemoteProvider::from_shared(Arc::clone(&source), config()));
        let recorded = record(provider.events());
        let weak = Arc::downgrade(&provider);
        let _ = provider.events().on_stations(move |_| {
            if let Some(provider) = weak.upgrade() {
                provider.stop();
            }
        });

        provider.start().unwrap();
        advance(Duration::from_secs(2)).await;
        assert!(!provider.is_running());
        assert_eq!(recorded.stations.lock().unwrap().len(), 1);

        advance(Duration::from_secs(120)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(recorded.stations.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_rejected() {
        let provider = RemoteProvider::new(
            FakeSource::default(),
            config().with_interval(Duration::ZERO),
        );
        assert!(matches!(
            provider.start(),
            Err(StartError::InvalidPollInterval)
        ));
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let provider = RemoteProvider::new(FakeSource::default(), config());
        assert!(matches!(provider.start(), Err(StartError::NoRuntime)));
    }

    #[test]
    fn default_poll_config() {
        let config = PollConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert!(config.repeat);
        assert!(!PollConfig::once().repeat);
    }
}
