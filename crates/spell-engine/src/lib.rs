//! # spell-engine
//!
//! Reconciles successive sick note (absence certificate) episodes per person
//! into merged, non-overlapping spells.
//!
//! Each entity row carries a fixed number of episode slots, each with a start
//! date and a duration recorded in days, weeks or months. The engine resolves
//! the units to one day count, then walks the slots in order and merges
//! episodes that start within a grouping tolerance window of the running
//! spell boundary.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use spell_engine::{reconcile_entity, EntityRecord, Episode, SpellConfig};
//!
//! let d = |m, day| NaiveDate::from_ymd_opt(2021, m, day).unwrap();
//! let record = EntityRecord::new(
//!     "p1",
//!     vec![
//!         Episode::starting(d(1, 1)).with_days(10.0),
//!         Episode::starting(d(1, 20)).with_days(5.0),
//!     ],
//! );
//!
//! let result = reconcile_entity(&record, &SpellConfig::default());
//! assert_eq!(result.first_spell_duration_days, Some(24));
//! ```
//!
//! ## Modules
//!
//! - [`normalizer`] — day/week/month fields → one canonical day count
//! - [`boundary`] — `start + duration + window` spell boundaries
//! - [`merger`] — chain merging of slots into spells
//! - [`batch`] — entity-parallel reconciliation and summaries
//! - [`table`] — CSV cohort codec with caller-labelled column layouts
//! - [`config`] — run-start tunables
//! - [`error`] — Error types

pub mod batch;
pub mod boundary;
pub mod config;
pub mod episode;
pub mod error;
pub mod merger;
pub mod normalizer;
pub mod table;

pub use batch::{reconcile_batch, reconcile_entity, BatchSummary, EntityResult};
pub use config::SpellConfig;
pub use episode::{DurationUnit, EntityRecord, Episode};
pub use error::SpellError;
pub use merger::{merge_first_spell, merge_spells, Anomaly, Spell, SpellOutcome};
pub use normalizer::{canonical_duration, normalize, NormalizedEpisode};
pub use table::{read_table, write_json, write_table, InputTable, OutputOptions, TableLayout};
