//! Range-query selection tests
//!
//! Coarsest resolution that still honours the step, among datasources whose
//! retention covers the whole window.

use super::*;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}

fn last(hours: i64, step: Duration) -> RangeQuery {
    RangeQuery {
        start: now() - TimeDelta::hours(hours),
        end: now(),
        step,
    }
}

#[test]
fn test_step_picks_coarsest_resolution_not_exceeding_it() {
    let datasources = vec![
        test_datasource(1, SECOND, None),
        test_datasource(2, MINUTE, None),
        test_datasource(3, MINUTE * 10, None),
    ];

    let selected =
        select_for_range(&datasources, &last(1, MINUTE * 2), now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_step_equal_to_resolution_is_usable() {
    let datasources = vec![
        test_datasource(1, SECOND, None),
        test_datasource(2, MINUTE * 10, None),
    ];

    let selected =
        select_for_range(&datasources, &last(1, MINUTE * 10), now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_retention_must_cover_start() {
    let datasources = vec![
        test_datasource(1, MINUTE, Some(HOUR)),
        test_datasource(2, MINUTE, None),
    ];

    let selected =
        select_for_range(&datasources, &last(2, MINUTE * 2), now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_retention_must_cover_end() {
    let datasources = vec![
        test_datasource(1, MINUTE, Some(HOUR)),
        test_datasource(2, SECOND, None),
    ];

    // Reversed window whose end falls outside the first datasource's retention
    let query = RangeQuery {
        start: now(),
        end: now() - TimeDelta::hours(2),
        step: MINUTE,
    };
    let selected = select_for_range(&datasources, &query, now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_equal_gap_first_listed_wins() {
    let datasources = vec![
        test_datasource(1, SECOND, None),
        test_datasource(2, MINUTE, None),
        test_datasource(3, MINUTE, None),
    ];

    let selected =
        select_for_range(&datasources, &last(1, MINUTE * 5), now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_step_finer_than_every_resolution_selects_nothing() {
    let datasources = vec![
        test_datasource(1, MINUTE, None),
        test_datasource(2, HOUR, None),
    ];

    assert!(select_for_range(&datasources, &last(1, SECOND * 15), now()).is_none());
}

#[test]
fn test_window_outside_every_retention_selects_nothing() {
    let datasources = vec![
        test_datasource(1, SECOND, Some(HOUR)),
        test_datasource(2, MINUTE, Some(HOUR * 6)),
    ];

    assert!(select_for_range(&datasources, &last(24, HOUR), now()).is_none());
}

#[test]
fn test_long_window_falls_back_to_long_retention() {
    let datasources = vec![
        test_datasource(1, SECOND * 15, Some(HOUR * 24)),
        test_datasource(2, MINUTE * 5, Some(HOUR * 24 * 30)),
        test_datasource(3, HOUR, None),
    ];

    let week = RangeQuery {
        start: now() - TimeDelta::days(7),
        end: now(),
        step: MINUTE,
    };
    // Only the 5m and 1h backends retain the week, and neither honours a 1m step
    assert!(select_for_range(&datasources, &week, now()).is_none());

    let coarse_week = RangeQuery { step: HOUR, ..week };
    let selected = select_for_range(&datasources, &coarse_week, now()).expect("should select");
    assert_eq!(selected.url().port(), Some(3));
}

#[test]
fn test_zero_step_only_matches_zero_resolution() {
    let datasources = vec![
        test_datasource(1, SECOND, None),
        test_datasource(2, Duration::ZERO, None),
    ];

    let selected =
        select_for_range(&datasources, &last(1, Duration::ZERO), now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_selection_borrows_only_the_datasource_list() {
    let datasources = vec![test_datasource(1, MINUTE, None)];

    let selected = {
        let query = last(1, MINUTE * 2);
        select_for_range(&datasources, &query, now())
    };
    assert_eq!(selected.map(|ds| ds.url().port()), Some(Some(1)));
}
