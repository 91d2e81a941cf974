//! Benchmarks for stability tracking and per-tick gating

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pose_enrollment::{
    classifier::{DirectionClassifier, PoseLabel},
    cooldown::CooldownGate,
    landmarks::{Detection, LandmarkLayout},
    replay::synthetic_face,
    session::CaptureSession,
    stability::StabilityTracker,
};
use std::time::{Duration, Instant};

fn benchmark_stability_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("stability_tracker");

    let poses = [PoseLabel::Front, PoseLabel::Front, PoseLabel::Right, PoseLabel::Front];

    for capacity in [6, 12, 30, 60] {
        let mut tracker = StabilityTracker::new(capacity, capacity * 3 / 4);

        group.bench_with_input(BenchmarkId::new("observe_100", capacity), &capacity, |b, _| {
            b.iter(|| {
                tracker.clear();
                for i in 0..100 {
                    black_box(tracker.observe(Some(poses[i % poses.len()])));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_session_observe(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_observe");

    let frame = Detection::Single(synthetic_face(LandmarkLayout::MediaPipe468, 0.0, 1.0, 1.0));
    let now = Instant::now();

    group.bench_function("front_frame", |b| {
        let mut session = CaptureSession::new(
            DirectionClassifier::new(LandmarkLayout::MediaPipe468),
            StabilityTracker::new(12, 9),
            CooldownGate::new(Duration::from_millis(1500)),
        );
        // Observing alone never advances the step
        b.iter(|| black_box(session.observe(black_box(frame.clone()), now)));
    });

    group.finish();
}

criterion_group!(benches, benchmark_stability_tracker, benchmark_session_observe);
criterion_main!(benches);
