use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use partup::upload::{ByteEvent, ProgressTracker, planner::plan};
use std::hint::black_box;

const CHUNK: u64 = 5_242_880;

// every part reports its bytes in 64 KiB steps, then completes
fn upload(total: u64) -> u64 {
    let mut tracker = ProgressTracker::new(total);

    for range in plan(total, CHUNK).unwrap_or_default() {
        let mut loaded = 0;
        while loaded < range.length {
            loaded = (loaded + 65_536).min(range.length);
            tracker.record(range.index(), ByteEvent::Progress(loaded));
        }
        tracker.record(range.index(), ByteEvent::Uploaded);
    }

    tracker.snapshot().sent
}

pub fn from_elem(c: &mut Criterion) {
    for parts in [1u64, 100, 1_000] {
        let total = parts * CHUNK;

        c.bench_with_input(BenchmarkId::new("parts", parts), &total, |b, &total| {
            b.iter(|| upload(black_box(total)));
        });
    }
}

criterion_group!(benches, from_elem);
criterion_main!(benches);
