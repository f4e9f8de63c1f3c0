//! Entity-parallel batch reconciliation.
//!
//! Each entity reads only its own row and owns its derived state, so the batch
//! is a plain parallel map collected back in input order.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, debug_span, info};

use crate::config::SpellConfig;
use crate::episode::EntityRecord;
use crate::merger::{merge_spells, Anomaly};
use crate::normalizer::normalize_all;

/// Reconciled output for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityResult {
    pub entity_id: String,
    /// Duration of the first merged spell; `None` when `anomaly` is set.
    pub first_spell_duration_days: Option<i64>,
    pub anomaly: Option<Anomaly>,
    /// Number of spells that produced a duration.
    pub spell_count: usize,
    /// Canonical duration per slot, slot order.
    pub canonical_durations: Vec<Option<f64>>,
    /// Slots whose recorded units disagreed and were averaged.
    pub inconsistent_episodes: usize,
}

/// Counts over a reconciled batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub entities: usize,
    pub computed: usize,
    pub missing_primary: usize,
    pub negative_spell: usize,
    pub boundary_overflow: usize,
    pub inconsistent_episodes: usize,
    pub mean_first_spell_days: Option<f64>,
}

impl BatchSummary {
    pub fn from_results(results: &[EntityResult]) -> Self {
        let mut summary = BatchSummary {
            entities: results.len(),
            ..Self::default()
        };
        let mut total: i64 = 0;

        for result in results {
            summary.inconsistent_episodes += result.inconsistent_episodes;
            match (result.first_spell_duration_days, result.anomaly) {
                (Some(days), _) => {
                    summary.computed += 1;
                    total += days;
                }
                (None, Some(Anomaly::MissingPrimaryEpisode)) => summary.missing_primary += 1,
                (None, Some(Anomaly::NegativeSpell { .. })) => summary.negative_spell += 1,
                (None, Some(Anomaly::BoundaryOverflow)) => summary.boundary_overflow += 1,
                (None, None) => {}
            }
        }

        if summary.computed > 0 {
            summary.mean_first_spell_days = Some(total as f64 / summary.computed as f64);
        }
        summary
    }
}

/// Reconcile a single entity row.
pub fn reconcile_entity(record: &EntityRecord, config: &SpellConfig) -> EntityResult {
    let _entity = debug_span!("entity", id = %record.entity_id).entered();
    let slots = normalize_all(&record.episodes);

    let inconsistent_episodes = slots.iter().filter(|s| s.inconsistent).count();
    if inconsistent_episodes > 0 {
        debug!(
            inconsistent_episodes,
            "averaged disagreeing duration units"
        );
    }

    let spells = merge_spells(&slots, config);
    let first = match slots.first() {
        Some(primary) if !primary.is_absent() => spells
            .first()
            .cloned()
            .unwrap_or(Err(Anomaly::MissingPrimaryEpisode)),
        _ => Err(Anomaly::MissingPrimaryEpisode),
    };
    let (first_spell_duration_days, anomaly) = match first {
        Ok(spell) => (Some(spell.duration_days), None),
        Err(anomaly) => (None, Some(anomaly)),
    };
    let spell_count = spells.iter().filter(|s| s.is_ok()).count();

    EntityResult {
        entity_id: record.entity_id.clone(),
        first_spell_duration_days,
        anomaly,
        spell_count,
        canonical_durations: slots.iter().map(|s| s.duration_days).collect(),
        inconsistent_episodes,
    }
}

/// Reconcile every entity in parallel, preserving input order.
pub fn reconcile_batch(records: &[EntityRecord], config: &SpellConfig) -> Vec<EntityResult> {
    let results: Vec<EntityResult> = records
        .par_iter()
        .map(|record| reconcile_entity(record, config))
        .collect();

    let summary = BatchSummary::from_results(&results);
    info!(
        entities = summary.entities,
        computed = summary.computed,
        missing_primary = summary.missing_primary,
        negative_spell = summary.negative_spell,
        inconsistent_episodes = summary.inconsistent_episodes,
        "batch reconciled"
    );
    results
}
