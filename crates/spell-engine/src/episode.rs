//! Raw episode and entity records as delivered by the upstream extraction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Unit in which an episode's duration was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
}

impl DurationUnit {
    pub const ALL: [DurationUnit; 3] = [DurationUnit::Days, DurationUnit::Weeks, DurationUnit::Months];

    /// Fixed conversion factor to days. Months are a flat 30 days: the source
    /// records a unit label, not calendar boundaries.
    pub fn days_per_unit(self) -> f64 {
        match self {
            DurationUnit::Days => 1.0,
            DurationUnit::Weeks => 7.0,
            DurationUnit::Months => 30.0,
        }
    }

    /// Column suffix used by the positional table convention.
    pub fn column_suffix(self) -> &'static str {
        match self {
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
            DurationUnit::Months => "months",
        }
    }
}

/// One episode slot. A slot with no start date means "no episode recorded".
///
/// Duration fields hold the values exactly as recorded, including the
/// upstream zero sentinel; see [`crate::normalizer`] for their interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub start: Option<NaiveDate>,
    pub duration_days: Option<f64>,
    pub duration_weeks: Option<f64>,
    pub duration_months: Option<f64>,
}

impl Episode {
    /// An occupied slot with no duration recorded yet.
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            ..Self::default()
        }
    }

    pub fn with_days(mut self, days: f64) -> Self {
        self.duration_days = Some(days);
        self
    }

    pub fn with_weeks(mut self, weeks: f64) -> Self {
        self.duration_weeks = Some(weeks);
        self
    }

    pub fn with_months(mut self, months: f64) -> Self {
        self.duration_months = Some(months);
        self
    }

    pub fn is_absent(&self) -> bool {
        self.start.is_none()
    }

    pub fn raw(&self, unit: DurationUnit) -> Option<f64> {
        match unit {
            DurationUnit::Days => self.duration_days,
            DurationUnit::Weeks => self.duration_weeks,
            DurationUnit::Months => self.duration_months,
        }
    }

    pub fn set_raw(&mut self, unit: DurationUnit, value: Option<f64>) {
        match unit {
            DurationUnit::Days => self.duration_days = value,
            DurationUnit::Weeks => self.duration_weeks = value,
            DurationUnit::Months => self.duration_months = value,
        }
    }
}

/// One row of the input table: an entity and its fixed-width episode slots.
///
/// `episodes[0]` is slot 1. Slots keep their positions even when empty so
/// that a gap never shifts later episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id: String,
    pub episodes: Vec<Episode>,
}

impl EntityRecord {
    pub fn new(entity_id: impl Into<String>, episodes: Vec<Episode>) -> Self {
        Self {
            entity_id: entity_id.into(),
            episodes,
        }
    }
}
