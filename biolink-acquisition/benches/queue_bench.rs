//! Ingestion path benchmarks
//!
//! Covers the per-tick hot path: decimating a raw chunk, building samples
//! and pushing them into a full queue (the drop-oldest case).

use biolink_acquisition::{Decimator, IngestQueue, Sample};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn channel_names() -> Vec<String> {
    ["Index", "EDA", "ECG"].iter().map(|s| s.to_string()).collect()
}

fn bench_push_overflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_overflow");

    for capacity in [100usize, 1000, 10_000] {
        let queue = IngestQueue::new(capacity).unwrap();
        for i in 0..capacity {
            queue.push(i as u64);
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &queue, |b, queue| {
            let mut i = 0u64;
            b.iter(|| {
                i += 1;
                black_box(queue.push(black_box(i)))
            });
        });
    }

    group.finish();
}

fn bench_drain(c: &mut Criterion) {
    let queue = IngestQueue::new(1000).unwrap();

    c.bench_function("queue_fill_and_drain_1000", |b| {
        b.iter(|| {
            for i in 0..1000u64 {
                queue.push(i);
            }
            black_box(queue.drain_all())
        });
    });
}

fn bench_decimate_chunk(c: &mut Criterion) {
    let names = channel_names();
    let include = vec!["EDA".to_string(), "ECG".to_string()];
    let raw: Vec<Vec<f64>> = (0..1000).map(|i| vec![i as f64, 2.5, 0.1]).collect();
    let queue = IngestQueue::new(1000).unwrap();

    c.bench_function("decimate_1000_samples_to_queue", |b| {
        b.iter(|| {
            let mut decimator = Decimator::new(1000.0, 100.0).unwrap();
            for (i, values) in raw.iter().enumerate() {
                if decimator.keep() {
                    queue.push(Sample::from_raw(
                        i as f64,
                        &names,
                        values,
                        Some(include.as_slice()),
                    ));
                }
            }
            black_box(queue.drain_all())
        });
    });
}

criterion_group!(benches, bench_push_overflow, bench_drain, bench_decimate_chunk);
criterion_main!(benches);
