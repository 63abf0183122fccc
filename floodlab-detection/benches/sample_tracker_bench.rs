use criterion::{black_box, criterion_group, criterion_main, Criterion};
use floodlab_detection::BadSampleTracker;

fn bench_tracker(c: &mut Criterion) {
    c.bench_function("observe_mixed_run", |b| {
        b.iter(|| {
            let mut tracker = BadSampleTracker::new(3);
            let mut fired = 0usize;
            for i in 0..1024u32 {
                if tracker.observe(black_box(i % 7 != 0)) {
                    fired += 1;
                }
            }
            fired
        })
    });
}

criterion_group!(benches, bench_tracker);
criterion_main!(benches);
