//! Benchmarks for the catalog merge.

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dealflow::catalog::{merge_by_day, CatalogLoad};
use dealflow::core::{DayKey, Item};
use dealflow::testing::items_for_day;

/// Ten items per day for `days` days back from 2025-01-14, newest first.
fn catalog_of_days(days: i64) -> Vec<Item> {
    let Some(newest) = NaiveDate::from_ymd_opt(2025, 1, 14) else {
        return Vec::new();
    };
    (0..days)
        .flat_map(|offset| {
            let day = DayKey::from_date(newest - Duration::days(offset));
            items_for_day(day.as_str(), 10)
        })
        .collect()
}

fn merge_benchmark(c: &mut Criterion) {
    let batch = items_for_day("20250115", 10);
    let mut group = c.benchmark_group("merge_by_day");
    for days in [30i64, 365] {
        let existing = catalog_of_days(days);
        group.bench_with_input(BenchmarkId::from_parameter(days), &existing, |b, existing| {
            b.iter(|| merge_by_day(black_box(existing.clone()), black_box(&batch)));
        });
    }
    group.finish();
}

fn parse_benchmark(c: &mut Criterion) {
    let raw = serde_json::to_string(&catalog_of_days(365)).unwrap_or_default();
    c.bench_function("catalog_parse_365_days", |b| {
        b.iter(|| CatalogLoad::parse(black_box(&raw)));
    });
}

criterion_group!(benches, merge_benchmark, parse_benchmark);
criterion_main!(benches);
