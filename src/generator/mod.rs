//! Load generator: periodic request loop plus rolling statistics.
//!
//! [`LoadGenerator`] drives one request per tick while running. Each request
//! is dispatched by the [`RequestExecutor`], which logs a pending entry and
//! reports the settled outcome to the [`StatsStore`]. The store is the only
//! writer of stats, logs, and chart series.

mod endpoint;
mod error;
mod executor;
mod store;
mod types;
mod window;


pub use endpoint::{EndpointResponse, HttpSampleEndpoint, SampleEndpoint};
pub use error::{ControlError, EndpointError, StoreClosed};
pub use executor::{classify, round_millis, InFlight, RequestExecutor};
pub use store::{LoadState, Settlement, StatsStore, StoreHandle, StoreSnapshot};
pub use types::{
    AggregateStats, ChartPoint, DerivedMetrics, LogEntry, RequestOutcome, RequestStatus,
    RunState, Snapshot, MAX_MESSAGE_LEN,
};
pub use window::RollingWindow;

use crate::config::GeneratorConfig;
use crate::dashboard::types::DashboardUpdate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Tick loop of the current run.
struct ActiveRun {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Start/stop controlled request loop over a shared state store.
pub struct LoadGenerator {
    executor: RequestExecutor,
    store: StoreHandle,
    /// Held across every control action so they never interleave
    active: Mutex<Option<ActiveRun>>,
    run_state: watch::Sender<RunState>,
    ws_broadcast: Option<broadcast::Sender<DashboardUpdate>>,
}

impl LoadGenerator {
    /// Spawn the state store and return a stopped generator.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(endpoint: Arc<dyn SampleEndpoint>, config: &GeneratorConfig) -> Self {
        let (store, handle) = StatsStore::new(config);
        store.start();
        Self::with_store(endpoint, handle, config.interval_ms, None)
    }

    /// Like [`LoadGenerator::spawn`], publishing every change to dashboards.
    pub fn spawn_with_broadcast(
        endpoint: Arc<dyn SampleEndpoint>,
        config: &GeneratorConfig,
        sender: broadcast::Sender<DashboardUpdate>,
    ) -> Self {
        let (store, handle) = StatsStore::new(config);
        store.with_broadcast(sender.clone()).start();
        Self::with_store(endpoint, handle, config.interval_ms, Some(sender))
    }

    fn with_store(
        endpoint: Arc<dyn SampleEndpoint>,
        store: StoreHandle,
        interval_ms: u64,
        ws_broadcast: Option<broadcast::Sender<DashboardUpdate>>,
    ) -> Self {
        let (run_state, _) = watch::channel(RunState {
            is_running: false,
            interval_ms: interval_ms.max(1),
        });

        Self {
            executor: RequestExecutor::new(endpoint, store.clone()),
            store,
            active: Mutex::new(None),
            run_state,
            ws_broadcast,
        }
    }

    /// Current run state.
    pub fn run_state(&self) -> RunState {
        *self.run_state.borrow()
    }

    /// Watch run state changes.
    pub fn subscribe_run_state(&self) -> watch::Receiver<RunState> {
        self.run_state.subscribe()
    }

    /// Executor shared by the tick loop, for dispatching requests directly.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Begin firing one request per interval. No-op if already running.
    ///
    /// The first request goes out one full interval after start.
    pub async fn start(&self) -> RunState {
        let mut active = self.active.lock().await;
        let current = self.run_state();
        if current.is_running {
            return current;
        }

        let cancel = CancellationToken::new();
        let handle = spawn_tick_loop(
            self.executor.clone(),
            Duration::from_millis(current.interval_ms),
            cancel.clone(),
        );
        *active = Some(ActiveRun { cancel, handle });

        let state = RunState {
            is_running: true,
            ..current
        };
        self.publish_run_state(state);
        tracing::info!(
            interval_ms = state.interval_ms,
            endpoint = %self.executor.endpoint().describe(),
            "Load generator started"
        );
        state
    }

    /// Cancel future ticks. In-flight requests keep running and still settle.
    pub async fn stop(&self) -> RunState {
        let mut active = self.active.lock().await;
        let Some(run) = active.take() else {
            return self.run_state();
        };

        run.cancel.cancel();
        if let Err(e) = run.handle.await {
            tracing::error!(error = %e, "Request loop task failed");
        }

        let state = RunState {
            is_running: false,
            ..self.run_state()
        };
        self.publish_run_state(state);
        tracing::info!("Load generator stopped");
        state
    }

    /// Change the interval used by the next start. Rejected while running.
    pub async fn set_interval(&self, interval_ms: u64) -> Result<RunState, ControlError> {
        let _active = self.active.lock().await;
        let current = self.run_state();
        if current.is_running {
            return Err(ControlError::Running);
        }
        if interval_ms == 0 {
            return Err(ControlError::InvalidInterval(interval_ms));
        }

        let state = RunState {
            interval_ms,
            ..current
        };
        self.publish_run_state(state);
        tracing::info!(interval_ms, "Request interval changed");
        Ok(state)
    }

    /// Clear stats, logs, and chart. Rejected while running.
    pub async fn reset(&self) -> Result<(), ControlError> {
        let _active = self.active.lock().await;
        if self.run_state().is_running {
            return Err(ControlError::Running);
        }

        self.store.reset().await?;
        tracing::info!("Load generator state reset");
        Ok(())
    }

    /// Current state for rendering.
    pub async fn snapshot(&self) -> Result<Snapshot, StoreClosed> {
        let store = self.store.snapshot().await?;
        Ok(Snapshot::new(self.run_state(), store))
    }

    /// Wait until every dispatched request has settled or `timeout` passes.
    ///
    /// Returns the number of requests still in flight.
    pub async fn drain(&self, timeout: Duration) -> Result<usize, StoreClosed> {
        let deadline = Instant::now() + timeout;
        loop {
            let in_flight = self.store.snapshot().await?.in_flight;
            if in_flight == 0 || Instant::now() >= deadline {
                return Ok(in_flight);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn publish_run_state(&self, state: RunState) {
        self.run_state.send_replace(state);
        crate::metrics::record_running(state.is_running);
        if let Some(sender) = &self.ws_broadcast {
            let _ = sender.send(crate::dashboard::websocket::create_run_state_update(state));
        }
    }
}

/// One dispatch per tick until cancelled. Missed ticks are skipped.
fn spawn_tick_loop(
    executor: RequestExecutor,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Request loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let in_flight = executor.dispatch();
                    tracing::trace!(request_id = %in_flight.id, "Request dispatched");
                }
            }
        }
    })
}
