//! Benchmarks for the tracker update loop

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use persontrack::{Bbox, ByteTracker, Detection, TrackerConfig};
use rand::prelude::*;
use std::hint::black_box;

/// People walking slowly across a 1920x1080 frame with jittered confidences
fn create_test_frames(n_persons: usize, n_frames: usize) -> Vec<Vec<Detection>> {
    let mut rng = StdRng::seed_from_u64(7);
    let starts: Vec<(f32, f32)> = (0..n_persons)
        .map(|_| (rng.gen_range(0.0..1700.0), rng.gen_range(0.0..800.0)))
        .collect();

    (0..n_frames)
        .map(|frame| {
            starts
                .iter()
                .filter_map(|&(x, y)| {
                    // roughly one in ten detections goes missing
                    if !rng.gen_bool(0.9) {
                        return None;
                    }
                    let x = x + frame as f32 * 4.0 + rng.gen_range(-2.0..2.0);
                    Some(Detection::new(
                        Bbox::new(x, y, x + 80.0, y + 200.0),
                        rng.gen_range(0.3..1.0),
                        frame as u64 + 1,
                    ))
                })
                .collect()
        })
        .collect()
}

fn bench_bytetrack_update(c: &mut Criterion) {
    let frames = create_test_frames(20, 30);

    c.bench_function("bytetrack_update_20_persons", |b| {
        b.iter_batched(
            || ByteTracker::new(TrackerConfig::default()),
            |mut tracker| {
                for detections in &frames {
                    let _confirmed = tracker.update(black_box(detections)).len();
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_iou_calculation(c: &mut Criterion) {
    let boxes: Vec<Bbox> = (0..50)
        .map(|i| {
            let x = i as f32 * 20.0;
            Bbox::new(x, 0.0, x + 80.0, 200.0)
        })
        .collect();

    c.bench_function("iou_calculation_50x30", |b| {
        b.iter(|| persontrack::ious(black_box(&boxes), black_box(&boxes[..30])))
    });
}

fn bench_various_crowd_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("bytetrack_crowd_sizes");

    for &n_persons in &[5, 10, 20, 50, 100] {
        let frames = create_test_frames(n_persons, 30);

        group.bench_with_input(
            BenchmarkId::new("persons", n_persons),
            &frames,
            |b, frames| {
                b.iter_batched(
                    || ByteTracker::new(TrackerConfig::default()),
                    |mut tracker| {
                        for detections in frames {
                            let _confirmed = tracker.update(black_box(detections)).len();
                        }
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_bytetrack_update,
    bench_iou_calculation,
    bench_various_crowd_sizes
);
criterion_main!(benches);
