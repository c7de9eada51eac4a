//! Priority queue benchmarks
//!
//! Benchmarks cover push/pop throughput across queue sizes and the async pop
//! path.
//!
//! Run with: `cargo bench --bench sync_bench -p tollgate-common --features
//! runtime`

use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Builder as RuntimeBuilder;
use tollgate_common::sync::{PriorityRequestQueue, QueueItem};

// ============================================================================
// Helpers
// ============================================================================

struct BenchItem {
    priority: u8,
}

impl QueueItem for BenchItem {
    fn priority(&self) -> u8 {
        self.priority
    }

    fn deadline(&self) -> Option<Instant> {
        None
    }
}

fn build_runtime() -> tokio::runtime::Runtime {
    RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime should build for sync benchmarks")
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("priority_queue_push_pop");

    for &count in &[256usize, 1024, 4096] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let queue = PriorityRequestQueue::new(count).expect("valid capacity");
                for i in 0..count {
                    let _ = queue.push(BenchItem { priority: (i % 10) as u8 });
                }
                while let Some(item) = queue.try_pop() {
                    black_box(item);
                }
            });
        });
    }

    group.finish();
}

fn bench_queue_async_pop(c: &mut Criterion) {
    let runtime = build_runtime();
    let mut group = c.benchmark_group("priority_queue_async_pop");

    group.bench_function("pop_ready_item", |b| {
        let queue = PriorityRequestQueue::new(16).expect("valid capacity");
        b.iter(|| {
            runtime.block_on(async {
                let _ = queue.push(BenchItem { priority: 5 });
                black_box(queue.pop(Duration::from_millis(1)).await);
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queue_push_pop, bench_queue_async_pop);
criterion_main!(benches);
