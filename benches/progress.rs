//! Benchmarks for the per-frame progress computation.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wipe_reveal::{scroll_progress, ClipInset, SectionRect};

/// One update's worth of math: progress plus the CSS string.
fn bench_update(c: &mut Criterion) {
    c.bench_function("progress_and_clip", |b| {
        b.iter(|| {
            let rect = SectionRect::new(black_box(212.5), black_box(640.0));
            let progress = scroll_progress(rect, black_box(900.0));
            ClipInset::reveal(progress).css_value()
        })
    });
}

/// A full scroll of a section through the viewport, one pixel at a time.
fn bench_sweep(c: &mut Criterion) {
    c.bench_function("progress_sweep_2000px", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            let mut top = 900.0;
            while top > -1100.0 {
                sum += scroll_progress(SectionRect::new(top, 640.0), 900.0);
                top -= 1.0;
            }
            black_box(sum)
        })
    });
}

criterion_group!(benches, bench_update, bench_sweep);
criterion_main!(benches);
