//! Instant-query selection tests
//!
//! Finest resolution among datasources that retain the queried instant,
//! with list order breaking ties.

use super::*;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}

#[test]
fn test_retention_excludes_finest_datasource() {
    let datasources = vec![
        test_datasource(1, SECOND, Some(HOUR)),
        test_datasource(2, MINUTE, None),
        test_datasource(3, HOUR, None),
    ];

    let two_hours_ago = now() - TimeDelta::hours(2);
    let selected = select_for_instant(&datasources, two_hours_ago, now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_recent_instant_prefers_finest_resolution() {
    let datasources = vec![
        test_datasource(1, HOUR, None),
        test_datasource(2, SECOND, Some(HOUR)),
        test_datasource(3, MINUTE, None),
    ];

    let ten_minutes_ago = now() - TimeDelta::minutes(10);
    let selected = select_for_instant(&datasources, ten_minutes_ago, now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_equal_resolution_first_listed_wins() {
    let datasources = vec![
        test_datasource(1, HOUR, None),
        test_datasource(2, MINUTE, None),
        test_datasource(3, MINUTE, None),
    ];

    let selected = select_for_instant(&datasources, now(), now()).expect("should select");
    assert_eq!(selected.url().port(), Some(2));
}

#[test]
fn test_instant_exactly_at_retention_boundary_is_eligible() {
    let datasources = vec![test_datasource(1, SECOND, Some(HOUR))];

    let boundary = now() - TimeDelta::hours(1);
    assert!(select_for_instant(&datasources, boundary, now()).is_some());

    let just_before = boundary - TimeDelta::nanoseconds(1);
    assert!(select_for_instant(&datasources, just_before, now()).is_none());
}

#[test]
fn test_no_datasource_retains_instant() {
    let datasources = vec![
        test_datasource(1, SECOND, Some(HOUR)),
        test_datasource(2, MINUTE, Some(HOUR * 24)),
    ];

    let last_week = now() - TimeDelta::days(7);
    assert!(select_for_instant(&datasources, last_week, now()).is_none());
}

#[test]
fn test_future_instant_is_retained() {
    let datasources = vec![test_datasource(1, SECOND, Some(HOUR))];
    let tomorrow = now() + TimeDelta::days(1);
    assert!(select_for_instant(&datasources, tomorrow, now()).is_some());
}

#[test]
fn test_empty_datasource_list_selects_nothing() {
    assert!(select_for_instant(&[], now(), now()).is_none());
}

#[test]
fn test_huge_retention_is_unbounded() {
    let datasources = vec![test_datasource(1, SECOND, Some(Duration::from_secs(u64::MAX)))];
    let ancient = DateTime::from_timestamp(0, 0).expect("valid timestamp");
    assert!(select_for_instant(&datasources, ancient, now()).is_some());
}

#[test]
fn test_start_time_does_not_affect_selection() {
    let future_start = now() + TimeDelta::days(365);
    let datasources = vec![
        test_datasource(1, SECOND, None).with_start_time(future_start),
        test_datasource(2, MINUTE, None),
    ];

    let selected = select_for_instant(&datasources, now(), now()).expect("should select");
    assert_eq!(selected.url().port(), Some(1));
}
