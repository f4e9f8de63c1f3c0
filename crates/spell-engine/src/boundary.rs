//! Spell-boundary calculation.
//!
//! The boundary of an episode is `start + canonical duration + tolerance window`:
//! it looks past the nominal end so that a following episode starting inside
//! the window is judged contiguous. Canonical durations may be fractional
//! (averaged units), so boundaries carry sub-day precision.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A day count as a `Duration`, rounded to the millisecond.
///
/// Returns `None` when the value is not finite or exceeds chrono's range.
pub fn days_to_duration(days: f64) -> Option<Duration> {
    if !days.is_finite() {
        return None;
    }
    Duration::try_milliseconds((days * MILLIS_PER_DAY).round() as i64)
}

/// Midnight at the start of `date`.
pub fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Candidate end of the spell seeded or extended by one episode.
///
/// A missing canonical duration contributes zero days. Returns `None` only
/// when the result falls outside the representable date range.
pub fn spell_end(
    start: NaiveDate,
    duration_days: Option<f64>,
    tolerance_window_days: u32,
) -> Option<NaiveDateTime> {
    let duration = days_to_duration(duration_days.unwrap_or(0.0))?;
    let window = Duration::days(i64::from(tolerance_window_days));
    start_of(start)
        .checked_add_signed(duration)?
        .checked_add_signed(window)
}

/// [`spell_end`] lifted over an optional start date; a missing start propagates.
pub fn spell_end_opt(
    start: Option<NaiveDate>,
    duration_days: Option<f64>,
    tolerance_window_days: u32,
) -> Option<NaiveDateTime> {
    start.and_then(|s| spell_end(s, duration_days, tolerance_window_days))
}

/// Whole days from `start` to `end`, floored, with the trailing window removed.
pub fn spell_length_days(start: NaiveDate, end: NaiveDateTime, tolerance_window_days: u32) -> i64 {
    let millis = (end - start_of(start)).num_milliseconds();
    millis.div_euclid(MILLIS_PER_DAY as i64) - i64::from(tolerance_window_days)
}
