//! Benchmarks for the state store hot path.
//!
//! Every tick costs one dispatch and one settlement; both must stay far
//! below the smallest practical interval (1ms).

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use loadgen::generator::{AggregateStats, LoadState, LogEntry, RequestOutcome, RollingWindow};
use uuid::Uuid;

fn bench_dispatch_and_settle(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_state");

    for capacity in [50usize, 200, 1000] {
        group.bench_with_input(
            BenchmarkId::new("dispatch_settle", capacity),
            &capacity,
            |b, &capacity| {
                let mut state = LoadState::new(capacity, capacity);
                // Start from a full window so every push evicts
                for _ in 0..capacity {
                    let id = Uuid::new_v4();
                    state.record_dispatch(0, LogEntry::pending(id, Utc::now()));
                    state.record_settlement(0, id, &RequestOutcome::success(200, "200 OK", 12));
                }

                b.iter(|| {
                    let id = Uuid::new_v4();
                    state.record_dispatch(0, LogEntry::pending(id, Utc::now()));
                    black_box(state.record_settlement(
                        0,
                        id,
                        &RequestOutcome::success(200, "200 OK", 12),
                    ))
                });
            },
        );
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut state = LoadState::new(200, 200);
    for i in 0..200 {
        let id = Uuid::new_v4();
        state.record_dispatch(0, LogEntry::pending(id, Utc::now()));
        state.record_settlement(0, id, &RequestOutcome::error(Some(500), "HTTP 500", i));
    }

    c.bench_function("load_state_snapshot_200", |b| {
        b.iter(|| black_box(state.snapshot()))
    });
}

fn bench_derived_metrics(c: &mut Criterion) {
    let stats = AggregateStats {
        total: 1_000_003,
        success: 999_000,
        error: 1_003,
        total_latency_ms: 45_000_123,
    };

    c.bench_function("derived_metrics", |b| b.iter(|| black_box(stats.derived())));
}

fn bench_rolling_window_push(c: &mut Criterion) {
    let mut window = RollingWindow::new(200);
    for i in 0..200u64 {
        window.push(i);
    }

    c.bench_function("rolling_window_push_full", |b| {
        b.iter(|| black_box(window.push(black_box(42))))
    });
}

criterion_group!(
    benches,
    bench_dispatch_and_settle,
    bench_snapshot,
    bench_derived_metrics,
    bench_rolling_window_push
);
criterion_main!(benches);
