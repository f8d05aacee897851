use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qorch_core::{OutcomeCounts, RunOutcome};
use qorch_exec::{aggregate_runs, partition_runs};

fn runs(variants: usize, runs: usize, width: usize) -> Vec<RunOutcome> {
    (0..variants * runs)
        .map(|seed| {
            let counts: OutcomeCounts = (0..64u64)
                .map(|state| {
                    let key = format!("{:0width$b}", (state * 7 + seed as u64) % (1 << width));
                    (key, (state * 31 + seed as u64) % 157)
                })
                .collect();
            RunOutcome::from_counts(counts)
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let flat = runs(16, 8, 12);
    c.bench_function("partition_and_aggregate_16x8", |b| {
        b.iter(|| {
            let groups = partition_runs(black_box(flat.clone()), 16, 8).expect("partition");
            for group in groups {
                let counts: Vec<_> = group.into_iter().map(|outcome| outcome.counts).collect();
                black_box(aggregate_runs(&counts, 10_000).expect("aggregate"));
            }
        })
    });
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
