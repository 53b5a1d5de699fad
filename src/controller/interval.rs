//! # Interval Bookkeeping
//!
//! Parsing of the control annotations on a `MetadataInjector` and the
//! interval/next-run calculations derived from them.
//!
//! Annotation values use the Go vocabulary that users already write for
//! other controllers: booleans as accepted by `strconv.ParseBool` and
//! durations such as `"10s"`, `"1h30m"` or `"1.5h"`.

use crate::constants::{
    ANNOTATION_DISABLE_AUTO_RECONCILE, ANNOTATION_RECONCILE_INTERVAL, INTERVAL_STATUS_DISABLED,
};
use crate::crd::MetadataInjector;
use chrono::{DateTime, TimeDelta, Utc};
use kube::ResourceExt;
use regex::Regex;
use std::fmt::Write as _;
use std::time::Duration;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Parse a boolean annotation value.
/// Accepts `1 t T TRUE true True 0 f F FALSE false False`.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse a duration string such as `"300ms"`, `"10s"`, `"1h30m"` or `"1.5h"`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `"0"`
/// is accepted. Negative durations, empty strings and values that overflow
/// return `None`.
#[must_use]
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);
    if value == "0" {
        return Some(Duration::ZERO);
    }
    if value.is_empty() || value.starts_with('-') {
        return None;
    }

    let segment = Regex::new(r"(?P<number>[0-9]*(?:\.[0-9]*)?)(?P<unit>ns|us|µs|μs|ms|s|m|h)").ok()?;

    let mut total_nanos: u128 = 0;
    let mut consumed = 0;
    for captures in segment.captures_iter(value) {
        let whole = captures.get(0)?;
        // Segments must be contiguous, anything in between is garbage
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();

        let number = captures.name("number")?.as_str();
        let unit_nanos: u128 = match captures.name("unit")?.as_str() {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SECOND,
            "m" => 60 * NANOS_PER_SECOND,
            "h" => 3_600 * NANOS_PER_SECOND,
            _ => return None,
        };
        total_nanos = total_nanos.checked_add(segment_nanos(number, unit_nanos)?)?;
    }
    if consumed != value.len() {
        return None;
    }

    // Go durations are signed 64-bit nanoseconds
    let nanos = i64::try_from(total_nanos).ok()?;
    Some(Duration::from_nanos(nanos.unsigned_abs()))
}

fn segment_nanos(number: &str, unit_nanos: u128) -> Option<u128> {
    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };
    let mut nanos = int_value.checked_mul(unit_nanos)?;

    let mut scale = unit_nanos;
    for digit in frac_part.chars() {
        scale /= 10;
        if scale == 0 {
            break;
        }
        nanos += u128::from(digit.to_digit(10)?) * scale;
    }
    Some(nanos)
}

/// Format a duration the way Go prints `time.Duration`: `"5m0s"`, `"1h30m0s"`,
/// `"10s"`, `"1.5ms"`, `"0s"`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < NANOS_PER_SECOND {
        let (unit, scale) = if nanos < 1_000 {
            ("ns", 1)
        } else if nanos < 1_000_000 {
            ("µs", 1_000)
        } else {
            ("ms", 1_000_000)
        };
        return format!("{}{unit}", decimal(nanos, scale));
    }

    let total_secs = duration.as_secs();
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = u128::from(total_secs % 60) * NANOS_PER_SECOND
        + u128::from(duration.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{}s", decimal(seconds, NANOS_PER_SECOND));
    out
}

/// `value / scale` as a decimal with trailing zeros trimmed
fn decimal(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let rem = value % scale;
    if rem == 0 {
        return whole.to_string();
    }
    let width = scale.ilog10() as usize;
    let fraction = format!("{rem:0width$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

/// Whether the declaration opted out of the periodic batch
#[must_use]
pub fn is_auto_reconcile_disabled(injector: &MetadataInjector) -> bool {
    injector
        .annotations()
        .get(ANNOTATION_DISABLE_AUTO_RECONCILE)
        .and_then(|v| parse_bool(v))
        .unwrap_or(false)
}

/// Interval override from the annotation, or `default` when absent, invalid or zero
#[must_use]
pub fn effective_interval(injector: &MetadataInjector, default: Duration) -> Duration {
    injector
        .annotations()
        .get(ANNOTATION_RECONCILE_INTERVAL)
        .and_then(|v| parse_duration(v))
        .filter(|d| !d.is_zero())
        .unwrap_or(default)
}

/// Text written to `status.interval`
#[must_use]
pub fn interval_status(injector: &MetadataInjector, default: Duration) -> String {
    if is_auto_reconcile_disabled(injector) {
        INTERVAL_STATUS_DISABLED.to_string()
    } else {
        format_duration(effective_interval(injector, default))
    }
}

/// `now + interval`, saturating at the largest representable time
#[must_use]
pub fn calculate_next_run(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(interval)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
