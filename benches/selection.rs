//! Datasource selection benchmarks
//!
//! Measures the non-I/O hot path of every proxied query: parameter parsing
//! and picking a datasource.
//!
//! Run with: `cargo bench`

use chrono::{TimeDelta, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use prom_query_proxy::{
    config::Datasource,
    datasource::{RangeQuery, select_for_instant, select_for_range},
    shared::params::{parse_duration, parse_time},
};
use std::hint::black_box;
use std::time::Duration;

/// Tiered layout: progressively coarser datasources with longer retention
fn tiered_datasources(count: usize) -> Vec<Datasource> {
    (0..count)
        .map(|i| {
            let resolution = Duration::from_secs(15 * (i as u64 + 1));
            let datasource = Datasource::new(&format!("http://prom-{}:9090", i), resolution)
                .expect("valid url");
            if i + 1 == count {
                datasource
            } else {
                datasource.with_retention(Duration::from_secs(86_400 * (i as u64 + 1)))
            }
        })
        .collect()
}

fn bench_instant_selection(c: &mut Criterion) {
    let now = Utc::now();
    let time = now - TimeDelta::days(3);
    let mut group = c.benchmark_group("select_for_instant");

    for count in [3usize, 10, 50] {
        let datasources = tiered_datasources(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &datasources, |b, ds| {
            b.iter(|| select_for_instant(black_box(ds), black_box(time), now));
        });
    }

    group.finish();
}

fn bench_range_selection(c: &mut Criterion) {
    let now = Utc::now();
    let query = RangeQuery {
        start: now - TimeDelta::days(2),
        end: now,
        step: Duration::from_secs(120),
    };
    let mut group = c.benchmark_group("select_for_range");

    for count in [3usize, 10, 50] {
        let datasources = tiered_datasources(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &datasources, |b, ds| {
            b.iter(|| select_for_range(black_box(ds), black_box(&query), now));
        });
    }

    group.finish();
}

fn bench_parameter_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parameter_parsing");

    group.bench_function("time_numeric", |b| {
        b.iter(|| parse_time("time", black_box("1600000000.123")));
    });
    group.bench_function("time_rfc3339", |b| {
        b.iter(|| parse_time("time", black_box("2020-09-13T12:26:40.123Z")));
    });
    group.bench_function("step_numeric", |b| {
        b.iter(|| parse_duration("step", black_box("60")));
    });
    group.bench_function("step_literal", |b| {
        b.iter(|| parse_duration("step", black_box("1h30m15.5s")));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_instant_selection,
    bench_range_selection,
    bench_parameter_parsing
);
criterion_main!(benches);
