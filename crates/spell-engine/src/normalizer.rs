//! Unit normalization: three recorded duration fields → one day count.
//!
//! Upstream serializes "no measurement" as `0`, so zero (and NaN) is read as
//! missing before any arithmetic. Weeks convert at 7 days, months at a flat
//! 30 days. When several units are populated for one episode the canonical
//! value is the mean of the converted values.

use chrono::NaiveDate;
use serde::Serialize;

use crate::episode::{DurationUnit, Episode};

/// Converted unit values further apart than this are reported as inconsistent.
pub const INCONSISTENCY_THRESHOLD_DAYS: f64 = 1.0;

/// An episode after unit resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedEpisode {
    pub start: Option<NaiveDate>,
    /// Canonical day count; `None` when the slot is empty or no unit was recorded.
    pub duration_days: Option<f64>,
    /// More than one unit was recorded and the converted values disagree.
    pub inconsistent: bool,
}

impl NormalizedEpisode {
    pub fn is_absent(&self) -> bool {
        self.start.is_none()
    }
}

/// Apply the zero-means-missing convention to one raw field.
pub fn recorded(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

/// Convert a raw field in `unit` to days, or `None` if it is missing.
pub fn to_days(unit: DurationUnit, value: Option<f64>) -> Option<f64> {
    recorded(value).map(|v| v * unit.days_per_unit())
}

fn converted(episode: &Episode) -> Vec<f64> {
    DurationUnit::ALL
        .iter()
        .filter_map(|&unit| to_days(unit, episode.raw(unit)))
        .collect()
}

/// Canonical duration in days for one episode.
///
/// Returns `None` for an empty slot or when all three unit fields are missing.
pub fn canonical_duration(episode: &Episode) -> Option<f64> {
    normalize(episode).duration_days
}

/// Resolve the units of one episode.
pub fn normalize(episode: &Episode) -> NormalizedEpisode {
    if episode.is_absent() {
        return NormalizedEpisode {
            start: None,
            duration_days: None,
            inconsistent: false,
        };
    }

    let values = converted(episode);
    if values.is_empty() {
        return NormalizedEpisode {
            start: episode.start,
            duration_days: None,
            inconsistent: false,
        };
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    NormalizedEpisode {
        start: episode.start,
        duration_days: Some(mean),
        inconsistent: max - min >= INCONSISTENCY_THRESHOLD_DAYS,
    }
}

/// Normalize every slot of an entity, preserving slot positions.
pub fn normalize_all(episodes: &[Episode]) -> Vec<NormalizedEpisode> {
    episodes.iter().map(normalize).collect()
}
