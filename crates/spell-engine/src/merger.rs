//! Chain merging of an entity's episode slots into spells.
//!
//! The first spell is seeded by slot 1 and walked forward over slots 2..N in
//! order. An episode joins the spell when its start falls in the trailing
//! window of the current boundary:
//!
//! ```text
//! boundary - window < start <= boundary
//! ```
//!
//! A joining episode replaces the boundary with its own `start + duration +
//! window` when that is later; a joining episode without a canonical duration
//! leaves the boundary where it is. Episodes that fail the test stay behind as
//! residuals and seed the following spells.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::boundary::{spell_end, spell_length_days, start_of};
use crate::config::SpellConfig;
use crate::normalizer::NormalizedEpisode;

/// Per-entity data-quality condition that suppresses a spell duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Slot 1 holds no episode, so there is no first spell.
    MissingPrimaryEpisode,
    /// The merged boundary precedes the seed start once the window is removed.
    NegativeSpell { days: i64 },
    /// A boundary fell outside the representable date range.
    BoundaryOverflow,
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::MissingPrimaryEpisode => write!(f, "missing primary episode"),
            Anomaly::NegativeSpell { days } => write!(f, "negative spell of {} days", days),
            Anomaly::BoundaryOverflow => write!(f, "spell boundary out of range"),
        }
    }
}

/// One merged spell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spell {
    /// Start date of the seeding episode.
    pub start: NaiveDate,
    /// Final boundary, tolerance window included.
    pub boundary: NaiveDateTime,
    /// 1-based slots absorbed into this spell, seed first, the rest ascending.
    pub slots: Vec<usize>,
    /// Whole days from `start` to `boundary` minus the window.
    pub duration_days: i64,
}

pub type SpellOutcome = std::result::Result<Spell, Anomaly>;

/// Result of walking one seed over the remaining candidate slots.
struct Walk {
    outcome: SpellOutcome,
    /// 0-based indices left unabsorbed, in slot order.
    residual: Vec<usize>,
}

fn walk(slots: &[NormalizedEpisode], seed: usize, candidates: &[usize], window_days: u32) -> Walk {
    let Some(start) = slots[seed].start else {
        return Walk {
            outcome: Err(Anomaly::MissingPrimaryEpisode),
            residual: candidates.to_vec(),
        };
    };
    let Some(mut boundary) = spell_end(start, slots[seed].duration_days, window_days) else {
        return Walk {
            outcome: Err(Anomaly::BoundaryOverflow),
            residual: candidates.to_vec(),
        };
    };

    let window = Duration::days(i64::from(window_days));
    let mut absorbed = vec![seed + 1];
    let mut residual = Vec::new();

    for (pos, &i) in candidates.iter().enumerate() {
        let episode = &slots[i];
        let Some(episode_start) = episode.start else {
            continue;
        };
        let at = start_of(episode_start);
        let below_window = boundary
            .checked_sub_signed(window)
            .is_some_and(|lower| at <= lower);
        if at > boundary || below_window {
            residual.push(i);
            continue;
        }

        absorbed.push(i + 1);
        let Some(days) = episode.duration_days else {
            continue;
        };
        match spell_end(episode_start, Some(days), window_days) {
            Some(candidate) => boundary = boundary.max(candidate),
            None => {
                residual.extend_from_slice(&candidates[pos + 1..]);
                return Walk {
                    outcome: Err(Anomaly::BoundaryOverflow),
                    residual,
                };
            }
        }
    }

    let duration_days = spell_length_days(start, boundary, window_days);
    let outcome = if duration_days < 0 {
        Err(Anomaly::NegativeSpell {
            days: duration_days,
        })
    } else {
        Ok(Spell {
            start,
            boundary,
            slots: absorbed,
            duration_days,
        })
    };

    Walk { outcome, residual }
}

fn present_indices(slots: &[NormalizedEpisode], config: &SpellConfig) -> Vec<usize> {
    slots
        .iter()
        .take(config.max_episodes)
        .enumerate()
        .filter(|(_, e)| !e.is_absent())
        .map(|(i, _)| i)
        .collect()
}

/// Merge the spell seeded by slot 1.
///
/// Returns [`Anomaly::MissingPrimaryEpisode`] when slot 1 is empty; a later
/// episode never stands in for it.
pub fn merge_first_spell(slots: &[NormalizedEpisode], config: &SpellConfig) -> SpellOutcome {
    match slots.first() {
        Some(primary) if !primary.is_absent() => {}
        _ => return Err(Anomaly::MissingPrimaryEpisode),
    }
    let present = present_indices(slots, config);
    match present.split_first() {
        Some((&seed, rest)) => walk(slots, seed, rest, config.tolerance_window_days).outcome,
        None => Err(Anomaly::MissingPrimaryEpisode),
    }
}

/// Merge every spell of an entity.
///
/// The first spell is seeded by the earliest occupied slot; each following
/// spell is seeded by the first episode the previous walks left unabsorbed and
/// considers only the remaining residuals. A residual starting inside a spell's
/// nominal span `[start, boundary - window]` is recorded in that spell without
/// moving its boundary, so spells never nest. When slot 1 is occupied the
/// first element has the boundary and duration of [`merge_first_spell`].
pub fn merge_spells(slots: &[NormalizedEpisode], config: &SpellConfig) -> Vec<SpellOutcome> {
    let window = Duration::days(i64::from(config.tolerance_window_days));
    let mut pending = present_indices(slots, config);
    let mut spells = Vec::new();

    while let Some((&seed, rest)) = pending.split_first() {
        let Walk {
            mut outcome,
            mut residual,
        } = walk(slots, seed, rest, config.tolerance_window_days);

        match &mut outcome {
            Ok(spell) => {
                let span_end = spell.boundary.checked_sub_signed(window);
                let span_start = start_of(spell.start);
                residual.retain(|&i| {
                    let contained = slots[i].start.is_some_and(|s| {
                        let at = start_of(s);
                        at >= span_start && span_end.is_some_and(|end| at <= end)
                    });
                    if contained {
                        spell.slots.push(i + 1);
                    }
                    !contained
                });
                spell.slots[1..].sort_unstable();
            }
            Err(anomaly) => debug!(slot = seed + 1, %anomaly, "spell suppressed"),
        }

        spells.push(outcome);
        pending = residual;
    }

    spells
}
