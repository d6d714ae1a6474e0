use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dashmap::DashMap;
use rand::seq::SliceRandom;
use room_session::id_types::ParticipantId;
use room_session::speaking::SpeakingTracker;

fn bench_clone_string(c: &mut Criterion) {
    let s = "some-long-participant-id-string-1234567890".to_string();
    c.bench_function("clone_string", |b| {
        b.iter(|| {
            let _ = black_box(s.clone());
        })
    });
}

fn bench_clone_strong_id(c: &mut Criterion) {
    let id = ParticipantId::from("some-long-participant-id-string-1234567890");
    c.bench_function("clone_strong_id", |b| {
        b.iter(|| {
            let _ = black_box(id.clone());
        })
    });
}

fn bench_dashmap_insert_strong_id(c: &mut Criterion) {
    let map = DashMap::new();
    let key = ParticipantId::from("some-long-participant-id-string-1234567890");

    c.bench_function("dashmap_insert_strong_id", |b| {
        b.iter(|| {
            map.insert(key.clone(), 1);
        })
    });
}

/// Add/remove churn over a speaking list the size of a large meeting.
fn bench_speaking_tracker_churn(c: &mut Criterion) {
    let ids: Vec<ParticipantId> = (0..100)
        .map(|i| ParticipantId::from(format!("participant-{}", i)))
        .collect();
    let mut rng = rand::thread_rng();

    c.bench_function("speaking_tracker_churn", |b| {
        b.iter(|| {
            let mut tracker = SpeakingTracker::new();
            for _ in 0..200 {
                let id = ids.choose(&mut rng).unwrap();
                tracker.add(id.clone());
            }
            for id in &ids {
                tracker.remove(id);
            }
            black_box(tracker.is_empty());
        })
    });
}

criterion_group!(
    benches,
    bench_clone_string,
    bench_clone_strong_id,
    bench_dashmap_insert_strong_id,
    bench_speaking_tracker_churn
);
criterion_main!(benches);
