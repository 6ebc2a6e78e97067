use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mailscope::model::hit::{Field, IndexHit, SubQueryResult};
use mailscope::search::reconcile::{reconcile, Reconciliation};
use mailscope::search::sort::{sort_hits, SortOrder};

/// Three overlapping sub-query results of `n` hits each.
fn sources(n: usize) -> Vec<SubQueryResult> {
    let now = Utc::now();
    let fields = [Field::From, Field::Subject, Field::Body];
    fields
        .iter()
        .enumerate()
        .map(|(s, &field)| {
            let hits = (0..n)
                .map(|i| {
                    let id = (i * (s + 1)) % (n * 2);
                    IndexHit::message(
                        format!("m{id}"),
                        format!("t{}", id / 3),
                        now - Duration::minutes(id as i64),
                        1.0 / (i + 1) as f64,
                    )
                    .with_match(field.as_str(), &[field])
                })
                .collect();
            Some(hits)
        })
        .collect()
}

fn bench_reconcile(c: &mut Criterion) {
    let input = sources(5_000);

    c.bench_function("reconcile_3x5000", |b| {
        b.iter(|| reconcile(black_box(input.clone())))
    });
}

fn bench_sort(c: &mut Criterion) {
    let Reconciliation::Candidates(candidates) = reconcile(sources(5_000)) else {
        return;
    };

    c.bench_function("sort_relevance", |b| {
        b.iter(|| sort_hits(black_box(&candidates), SortOrder::Relevance))
    });
    c.bench_function("sort_chronological_desc", |b| {
        b.iter(|| sort_hits(black_box(&candidates), SortOrder::ChronologicalDesc))
    });
}

criterion_group!(benches, bench_reconcile, bench_sort);
criterion_main!(benches);
