//! Single-writer state store.
//!
//! Stats, the request log, and the latency chart are owned by one task that
//! drains a command channel. Every dispatch and settlement is applied as one
//! step, so concurrently settling requests never lose updates and readers
//! never observe a half-applied settlement.

use super::error::StoreClosed;
use super::types::{AggregateStats, ChartPoint, DerivedMetrics, LogEntry, RequestOutcome};
use super::window::RollingWindow;
use crate::config::GeneratorConfig;
use crate::dashboard::types::DashboardUpdate;
use crate::dashboard::websocket::{
    create_request_dispatched_update, create_request_settled_update, create_reset_update,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Store contents at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub stats: AggregateStats,
    pub derived: DerivedMetrics,
    pub in_flight: usize,
    pub log_capacity: usize,
    pub chart_capacity: usize,
    pub logs: Vec<LogEntry>,
    pub chart: Vec<ChartPoint>,
    /// Sequence number of the last change included
    pub seq: u64,
}

/// Result of applying one settlement, published to dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    /// Updated log entry, `None` if it already left the log window
    pub entry: Option<LogEntry>,
    pub point: ChartPoint,
    pub stats: AggregateStats,
    pub derived: DerivedMetrics,
    pub in_flight: usize,
}

/// Stats, log, and chart for the current generation.
///
/// A generation ends at every reset; dispatches and settlements tagged with
/// an older generation are ignored. `seq` increases with every applied change
/// and never goes back, not even on reset.
#[derive(Debug)]
pub struct LoadState {
    generation: u64,
    seq: u64,
    stats: AggregateStats,
    logs: RollingWindow<LogEntry>,
    chart: RollingWindow<ChartPoint>,
    in_flight: HashSet<Uuid>,
}

impl LoadState {
    pub fn new(log_capacity: usize, chart_capacity: usize) -> Self {
        Self {
            generation: 0,
            seq: 0,
            stats: AggregateStats::default(),
            logs: RollingWindow::new(log_capacity),
            chart: RollingWindow::new(chart_capacity),
            in_flight: HashSet::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Append a pending entry. Returns false for stale generations or reused ids.
    pub fn record_dispatch(&mut self, generation: u64, entry: LogEntry) -> bool {
        if generation != self.generation || !self.in_flight.insert(entry.id) {
            return false;
        }
        self.logs.push(entry);
        self.seq += 1;
        true
    }

    /// Settle an in-flight request.
    ///
    /// Each id settles at most once. A request whose pending row was already
    /// evicted from the log still counts in stats and chart.
    pub fn record_settlement(
        &mut self,
        generation: u64,
        id: Uuid,
        outcome: &RequestOutcome,
    ) -> Option<Settlement> {
        if generation != self.generation || !self.in_flight.remove(&id) {
            return None;
        }

        self.stats.record(outcome);
        self.seq += 1;

        let entry = self
            .logs
            .iter_mut()
            .rev()
            .find(|entry| entry.id == id)
            .map(|entry| {
                entry.settle(outcome);
                entry.clone()
            });

        let point = ChartPoint::now(outcome.latency_ms);
        self.chart.push(point.clone());

        Some(Settlement {
            entry,
            point,
            stats: self.stats,
            derived: self.stats.derived(),
            in_flight: self.in_flight.len(),
        })
    }

    /// Clear everything and move to a new generation.
    pub fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.seq += 1;
        self.stats = AggregateStats::default();
        self.logs.clear();
        self.chart.clear();
        self.in_flight.clear();
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            stats: self.stats,
            derived: self.stats.derived(),
            in_flight: self.in_flight.len(),
            log_capacity: self.logs.capacity(),
            chart_capacity: self.chart.capacity(),
            logs: self.logs.to_vec(),
            chart: self.chart.to_vec(),
            seq: self.seq,
        }
    }
}

/// Commands accepted by the store task.
#[derive(Debug)]
pub enum StoreCommand {
    Dispatched {
        generation: u64,
        entry: LogEntry,
    },
    Settled {
        generation: u64,
        id: Uuid,
        outcome: RequestOutcome,
    },
    Reset {
        generation: u64,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<StoreSnapshot>,
    },
}

/// Cloneable sender side of the store.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreCommand>,
    generation: Arc<AtomicU64>,
}

impl StoreHandle {
    /// Enqueue a pending entry. Returns the generation it was tagged with,
    /// which must accompany its settlement.
    pub fn dispatched(&self, entry: LogEntry) -> u64 {
        let generation = self.generation.load(Ordering::SeqCst);
        if self
            .tx
            .send(StoreCommand::Dispatched { generation, entry })
            .is_err()
        {
            tracing::warn!("State store closed, dropping dispatched request");
        }
        generation
    }

    pub fn settled(&self, generation: u64, id: Uuid, outcome: RequestOutcome) {
        if self
            .tx
            .send(StoreCommand::Settled {
                generation,
                id,
                outcome,
            })
            .is_err()
        {
            tracing::warn!(request_id = %id, "State store closed, dropping settlement");
        }
    }

    /// Clear the store and start a new generation. Resolves once applied.
    pub async fn reset(&self) -> Result<(), StoreClosed> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Reset { generation, reply })
            .map_err(|_| StoreClosed)?;
        rx.await.map_err(|_| StoreClosed)
    }

    /// Read the store after every previously sent command has been applied.
    pub async fn snapshot(&self) -> Result<StoreSnapshot, StoreClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(StoreCommand::Snapshot { reply })
            .map_err(|_| StoreClosed)?;
        rx.await.map_err(|_| StoreClosed)
    }
}

/// Task owning [`LoadState`]. Runs until every [`StoreHandle`] is dropped.
pub struct StatsStore {
    state: LoadState,
    rx: mpsc::UnboundedReceiver<StoreCommand>,
    ws_broadcast: Option<broadcast::Sender<DashboardUpdate>>,
}

impl StatsStore {
    pub fn new(config: &GeneratorConfig) -> (Self, StoreHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Self {
            state: LoadState::new(config.log_capacity, config.chart_capacity),
            rx,
            ws_broadcast: None,
        };
        let handle = StoreHandle {
            tx,
            generation: Arc::new(AtomicU64::new(0)),
        };
        (store, handle)
    }

    /// Set the WebSocket broadcast sender for dashboard updates.
    pub fn with_broadcast(mut self, sender: broadcast::Sender<DashboardUpdate>) -> Self {
        self.ws_broadcast = Some(sender);
        self
    }

    /// Spawn the store task.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.apply(command);
        }
        tracing::debug!("State store stopped");
    }

    fn apply(&mut self, command: StoreCommand) {
        match command {
            StoreCommand::Dispatched { generation, entry } => {
                let update = create_request_dispatched_update(&entry);
                if self.state.record_dispatch(generation, entry) {
                    self.publish(update.with_seq(self.state.seq()));
                }
            }
            StoreCommand::Settled {
                generation,
                id,
                outcome,
            } => match self.state.record_settlement(generation, id, &outcome) {
                Some(settlement) => self.publish(
                    create_request_settled_update(&settlement).with_seq(self.state.seq()),
                ),
                None => {
                    tracing::debug!(request_id = %id, generation, "Ignoring stale settlement")
                }
            },
            StoreCommand::Reset { generation, reply } => {
                self.state.reset(generation);
                let snapshot = self.state.snapshot();
                self.publish(create_reset_update(&snapshot).with_seq(snapshot.seq));
                let _ = reply.send(());
            }
            StoreCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    fn publish(&self, update: DashboardUpdate) {
        if let Some(sender) = &self.ws_broadcast {
            // Ignore error if no receivers are listening
            let _ = sender.send(update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::types::UpdateType;
    use chrono::Utc;

    fn pending() -> LogEntry {
        LogEntry::pending(Uuid::new_v4(), Utc::now())
    }

    fn ok(latency_ms: u64) -> RequestOutcome {
        RequestOutcome::success(200, "200 OK", latency_ms)
    }

    #[test]
    fn test_dispatch_then_settle() {
        let mut state = LoadState::new(10, 10);
        let entry = pending();
        let id = entry.id;

        assert!(state.record_dispatch(0, entry));
        assert_eq!(state.in_flight(), 1);
        assert_eq!(state.stats().total, 0);

        let settlement = state.record_settlement(0, id, &ok(25)).unwrap();
        assert_eq!(settlement.stats.total, 1);
        assert_eq!(settlement.stats.success, 1);
        assert_eq!(settlement.point.latency_ms, 25.0);
        let entry = settlement.entry.unwrap();
        assert_eq!(entry.latency_ms, Some(25));
        assert_eq!(state.in_flight(), 0);
    }

    #[test]
    fn test_settle_twice_counts_once() {
        let mut state = LoadState::new(10, 10);
        let entry = pending();
        let id = entry.id;
        state.record_dispatch(0, entry);

        assert!(state.record_settlement(0, id, &ok(5)).is_some());
        assert!(state
            .record_settlement(0, id, &RequestOutcome::error(Some(500), "x", 5))
            .is_none());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.stats.total, 1);
        assert_eq!(snapshot.chart.len(), 1);
        assert_eq!(snapshot.logs.len(), 1);
    }

    #[test]
    fn test_unknown_id_ignored() {
        let mut state = LoadState::new(10, 10);
        assert!(state.record_settlement(0, Uuid::new_v4(), &ok(5)).is_none());
        assert_eq!(state.stats().total, 0);
    }

    #[test]
    fn test_duplicate_dispatch_rejected() {
        let mut state = LoadState::new(10, 10);
        let entry = pending();
        assert!(state.record_dispatch(0, entry.clone()));
        assert!(!state.record_dispatch(0, entry));
        assert_eq!(state.snapshot().logs.len(), 1);
    }

    #[test]
    fn test_evicted_pending_still_counted() {
        let mut state = LoadState::new(2, 10);
        let first = pending();
        let first_id = first.id;
        state.record_dispatch(0, first);
        state.record_dispatch(0, pending());
        state.record_dispatch(0, pending());

        let settlement = state.record_settlement(0, first_id, &ok(7)).unwrap();
        assert!(settlement.entry.is_none());
        assert_eq!(settlement.stats.total, 1);
        assert_eq!(state.snapshot().logs.len(), 2);
    }

    #[test]
    fn test_reset_drops_stale_generation() {
        let mut state = LoadState::new(10, 10);
        let entry = pending();
        let id = entry.id;
        state.record_dispatch(0, entry);

        state.reset(1);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.stats, AggregateStats::default());
        assert!(snapshot.logs.is_empty());
        assert!(snapshot.chart.is_empty());

        assert!(state.record_settlement(0, id, &ok(3)).is_none());
        assert!(!state.record_dispatch(0, pending()));
        assert_eq!(state.stats().total, 0);
    }

    #[test]
    fn test_chart_window_capped() {
        let mut state = LoadState::new(100, 3);
        for latency in 0..5 {
            let entry = pending();
            let id = entry.id;
            state.record_dispatch(0, entry);
            state.record_settlement(0, id, &ok(latency));
        }
        let chart: Vec<f64> = state.snapshot().chart.iter().map(|p| p.latency_ms).collect();
        assert_eq!(chart, vec![2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_concurrent_settlements_not_lost() {
        let (store, handle) = StatsStore::new(&GeneratorConfig::default());
        store.start();

        let mut tasks = Vec::new();
        for i in 0..500u64 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let entry = pending();
                let id = entry.id;
                let generation = handle.dispatched(entry);
                tokio::task::yield_now().await;
                let outcome = if i % 5 == 0 {
                    RequestOutcome::error(None, "connection failed", 1)
                } else {
                    ok(1)
                };
                handle.settled(generation, id, outcome);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.stats.total, 500);
        assert_eq!(snapshot.stats.error, 100);
        assert_eq!(snapshot.stats.success, 400);
        assert_eq!(snapshot.stats.total_latency_ms, 500);
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.logs.len(), 200);
        assert_eq!(snapshot.chart.len(), 200);
    }

    #[tokio::test]
    async fn test_reset_through_handle() {
        let (store, handle) = StatsStore::new(&GeneratorConfig::default());
        store.start();

        let entry = pending();
        let id = entry.id;
        let generation = handle.dispatched(entry);
        handle.reset().await.unwrap();
        handle.settled(generation, id, ok(9));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.stats.total, 0);
        assert!(snapshot.logs.is_empty());
        assert!(snapshot.chart.is_empty());
    }

    #[tokio::test]
    async fn test_store_publishes_updates() {
        let (sender, mut rx) = broadcast::channel(16);
        let (store, handle) = StatsStore::new(&GeneratorConfig::default());
        store.with_broadcast(sender).start();

        let entry = pending();
        let id = entry.id;
        let generation = handle.dispatched(entry);
        handle.settled(generation, id, ok(4));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.update_type, UpdateType::RequestDispatched);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.update_type, UpdateType::RequestSettled);
        assert_eq!(second.data["stats"]["total"], 1);
    }

    #[test]
    fn test_seq_counts_applied_changes_only() {
        let mut state = LoadState::new(10, 10);
        let entry = pending();
        let id = entry.id;

        assert!(state.record_dispatch(0, entry.clone()));
        assert_eq!(state.seq(), 1);
        assert!(!state.record_dispatch(0, entry));
        assert_eq!(state.seq(), 1);

        state.record_settlement(0, id, &ok(3));
        assert!(state.record_settlement(0, id, &ok(3)).is_none());
        assert_eq!(state.seq(), 2);

        state.reset(1);
        assert_eq!(state.seq(), 3);
        assert_eq!(state.snapshot().seq, 3);
    }

    #[tokio::test]
    async fn test_published_updates_carry_increasing_seq() {
        let (sender, mut rx) = broadcast::channel(16);
        let (store, handle) = StatsStore::new(&GeneratorConfig::default());
        store.with_broadcast(sender).start();

        let entry = pending();
        let id = entry.id;
        let generation = handle.dispatched(entry);
        handle.settled(generation, id, ok(4));
        handle.reset().await.unwrap();

        let seqs: Vec<Option<u64>> = vec![
            rx.recv().await.unwrap().seq,
            rx.recv().await.unwrap().seq,
            rx.recv().await.unwrap().seq,
        ];
        assert_eq!(seqs, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(handle.snapshot().await.unwrap().seq, 3);
    }

    #[tokio::test]
    async fn test_handle_reports_closed_store() {
        let (store, handle) = StatsStore::new(&GeneratorConfig::default());
        drop(store);
        assert_eq!(handle.snapshot().await.unwrap_err(), StoreClosed);
        assert_eq!(handle.reset().await.unwrap_err(), StoreClosed);
    }
}
