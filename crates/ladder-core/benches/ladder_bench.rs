//! # Ladder Benchmarks
//!
//! Performance benchmarks for the progression engine and the portfolio
//! aggregator.
//!
//! Run with: `cargo bench -p ladder-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ladder_core::progression::recompute_all;
use ladder_core::{
    EvidenceId, EvidenceItem, IncubatorId, LedgerTxn, Level, MemoryLedger, ReviewStatus,
    StartupId, StaticDirectory, Track, portfolio,
};
use std::hint::black_box;

/// A ledger where each of `startups` startups has every TRL level approved.
fn populated_ledger(startups: u64) -> MemoryLedger {
    let mut ledger = MemoryLedger::new();
    for s in 0..startups {
        for level in Level::all() {
            let id = ledger.allocate_id().expect("id");
            ledger
                .put_evidence(&EvidenceItem {
                    id: EvidenceId(id),
                    startup: StartupId(s),
                    track: Track::Trl,
                    level,
                    description: None,
                    file_url: None,
                    status: ReviewStatus::Approved,
                    reviewer_notes: String::new(),
                    created_at: id,
                    updated_at: id,
                })
                .expect("put");
        }
        recompute_all(&mut ledger, StartupId(s)).expect("recompute");
    }
    ledger
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute");

    for size in [10u64, 100, 1000].iter() {
        let ledger = populated_ledger(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut draft = ledger.clone();
                black_box(recompute_all(&mut draft, StartupId(0)).expect("recompute"))
            });
        });
    }

    group.finish();
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");

    for size in [10u64, 100, 1000].iter() {
        let ledger = populated_ledger(*size);
        let directory = (0..*size).fold(StaticDirectory::new(), |d, s| {
            d.associate(IncubatorId(1), StartupId(s))
        });
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(
                    portfolio::summarize(&ledger, &directory, &directory, IncubatorId(1))
                        .expect("summary"),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_recompute, bench_summarize);
criterion_main!(benches);
