//! Query-string parameter codec
//!
//! Prometheus clients send instants and durations in two shapes: a bare
//! (possibly fractional) number of seconds, or a textual form (RFC3339 for
//! instants, unit-suffixed literals such as `1h30m` for durations).

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use std::time::Duration;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Maximum number of fractional digits honoured in a duration literal
///
/// Digits past nanosecond-of-an-hour precision cannot change the result.
const MAX_FRACTION_DIGITS: usize = 18;

/// Returns true when the value consists only of ASCII digits and dots
///
/// Mirrors the `^[0-9.]+$` test clients of the query API rely on. Note that
/// `"1.2.3"` is "numeric" here and then fails float parsing.
pub fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

/// Parse an instant parameter (`time`, `start`, `end`)
///
/// # Errors
///
/// Returns `AppError::BadParameter` naming the parameter and raw value when
/// the value is neither numeric seconds nor an RFC3339 timestamp.
pub fn parse_time(name: &'static str, value: &str) -> AppResult<DateTime<Utc>> {
    let bad = |reason: String| AppError::BadParameter {
        name,
        value: value.to_string(),
        reason,
    };

    if is_numeric(value) {
        let seconds: f64 = value.parse().map_err(|e| bad(format!("{}", e)))?;
        let nanos = seconds * NANOS_PER_SECOND;
        if !nanos.is_finite() || nanos > i64::MAX as f64 {
            return Err(bad("timestamp out of range".to_string()));
        }
        return Ok(DateTime::from_timestamp_nanos(nanos as i64));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| bad(format!("not an RFC3339 timestamp: {}", e)))
}

/// Parse a duration parameter (`step`)
///
/// # Errors
///
/// Returns `AppError::BadParameter` when the value is neither numeric seconds
/// nor a duration literal accepted by [`parse_duration_literal`].
pub fn parse_duration(name: &'static str, value: &str) -> AppResult<Duration> {
    let bad = |reason: String| AppError::BadParameter {
        name,
        value: value.to_string(),
        reason,
    };

    if is_numeric(value) {
        let seconds: f64 = value.parse().map_err(|e| bad(format!("{}", e)))?;
        let nanos = seconds * NANOS_PER_SECOND;
        if !nanos.is_finite() || nanos > u64::MAX as f64 {
            return Err(bad("duration out of range".to_string()));
        }
        return Ok(Duration::from_nanos(nanos as u64));
    }

    parse_duration_literal(value).map_err(bad)
}

/// Parse a compact duration literal such as `15s`, `1h30m` or `1.5h`
///
/// Grammar: an optional leading `+`, then one or more `<number><unit>` pairs
/// where the number may carry a fractional part and the unit is one of
/// `ns`, `us` (`µs`, `μs`), `ms`, `s`, `m`, `h`. A bare `0` is accepted.
/// Negative literals are rejected since a negative step or retention has no
/// meaning here.
pub fn parse_duration_literal(literal: &str) -> Result<Duration, String> {
    let mut rest = literal;
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if rest.starts_with('-') {
        return Err(format!("negative duration {:?}", literal));
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(format!("invalid duration {:?}", literal));
    }

    let overflow = || format!("duration {:?} is too large", literal);
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, tail) = rest.split_at(int_len);
        rest = tail;

        let mut frac_part = "";
        if let Some(tail) = rest.strip_prefix('.') {
            let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
            (frac_part, rest) = tail.split_at(frac_len);
        }

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("invalid duration {:?}", literal));
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (unit, tail) = rest.split_at(unit_len);
        rest = tail;

        if unit.is_empty() {
            return Err(format!("missing unit in duration {:?}", literal));
        }
        let scale = unit_nanos(unit)
            .ok_or_else(|| format!("unknown unit {:?} in duration {:?}", unit, literal))?;

        if !int_part.is_empty() {
            let whole: u128 = int_part.parse().map_err(|_| overflow())?;
            let nanos = whole.checked_mul(scale).ok_or_else(overflow)?;
            total = total.checked_add(nanos).ok_or_else(overflow)?;
        }

        let digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
        if !digits.is_empty() {
            let fraction: u128 = digits.parse().map_err(|_| overflow())?;
            total += fraction * scale / 10u128.pow(digits.len() as u32);
        }

        if total > u128::from(u64::MAX) {
            return Err(overflow());
        }
    }

    Ok(Duration::from_nanos(total as u64))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}
