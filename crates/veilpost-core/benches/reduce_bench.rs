//! Benchmarks for the progress merge
//!
//! Run with: cargo bench -p veilpost-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use veilpost_core::decrypt::{reduce, DecodedMessage, DisplayState, ProgressEvent, UnitUpdate};

fn updates_for(units: usize) -> Vec<UnitUpdate> {
    let mut updates = Vec::with_capacity(units * 3);
    for i in 0..units {
        let key = format!("https://img/{}.png", i);
        updates.push(UnitUpdate::new(key.clone(), ProgressEvent::finding_post_key()));
        updates.push(UnitUpdate::new(
            key.clone(),
            ProgressEvent::success(DecodedMessage::new("hi"), vec![1, 2, 3]),
        ));
        // Spurious progress after success
        updates.push(UnitUpdate::new(key, ProgressEvent::finding_post_key()));
    }
    updates
}

fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce");

    for units in [1usize, 8, 64] {
        let updates = updates_for(units);
        group.bench_with_input(BenchmarkId::from_parameter(units), &updates, |b, updates| {
            b.iter(|| {
                black_box(
                    updates
                        .iter()
                        .cloned()
                        .fold(DisplayState::new(), reduce),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reduce);
criterion_main!(benches);
