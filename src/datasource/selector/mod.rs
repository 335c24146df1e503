//! Datasource selection for instant and range queries
//!
//! Both procedures are pure: they read the ordered datasource list and the
//! caller-supplied `now`, and never perform I/O. Ties always go to the
//! datasource listed first.

use crate::config::Datasource;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Time window and sampling step of a range query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

/// Earliest instant the datasource guarantees to hold, `None` when unbounded
///
/// A retention too large to subtract from `now` is treated as unbounded.
fn retention_start(datasource: &Datasource, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let retention = TimeDelta::from_std(datasource.retention()?).ok()?;
    now.checked_sub_signed(retention)
}

fn retains(datasource: &Datasource, t: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    retention_start(datasource, now).is_none_or(|cutoff| t >= cutoff)
}

/// Select the datasource for an instant query at `time`
///
/// Among datasources whose retention covers `time`, picks the finest
/// resolution. Returns `None` when no datasource retains `time`.
pub fn select_for_instant(
    datasources: &[Datasource],
    time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<&Datasource> {
    // min_by_key keeps the first of equal minima
    datasources
        .iter()
        .filter(|ds| retains(ds, time, now))
        .min_by_key(|ds| ds.resolution())
}

/// Select the datasource for a range query
///
/// A datasource is usable when its retention covers both `start` and `end`
/// and its resolution is not coarser than `step`. Among usable datasources
/// the one with the smallest `step - resolution` gap wins, so coarse steps
/// land on the coarsest backend able to honour them.
pub fn select_for_range<'a>(
    datasources: &'a [Datasource],
    query: &RangeQuery,
    now: DateTime<Utc>,
) -> Option<&'a Datasource> {
    datasources
        .iter()
        .filter(|ds| retains(ds, query.start, now) && retains(ds, query.end, now))
        .filter_map(|ds| query.step.checked_sub(ds.resolution()).map(|gap| (gap, ds)))
        .min_by_key(|(gap, _)| *gap)
        .map(|(_, ds)| ds)
}

#[cfg(test)]
mod tests_instant;
#[cfg(test)]
mod tests_range;

/// Shared test helper: build a datasource from a resolution and optional retention
#[cfg(test)]
fn test_datasource(port: u16, resolution: Duration, retention: Option<Duration>) -> Datasource {
    let ds = Datasource::new(&format!("http://localhost:{}", port), resolution)
        .expect("test url should be valid");
    match retention {
        Some(retention) => ds.with_retention(retention),
        None => ds,
    }
}
