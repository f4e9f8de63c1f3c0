//! Tabular codec for cohort files.
//!
//! Input rows carry an identifier column and, for each 1-based slot `i`, the
//! positional columns `<label>_<i>_date`, `<label>_<i>_duration_days`,
//! `<label>_<i>_duration_weeks` and `<label>_<i>_duration_months`. The label is
//! supplied explicitly by the caller through [`TableLayout::builder`].

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

use chrono::{NaiveDate, NaiveDateTime};

use crate::batch::EntityResult;
use crate::config::DEFAULT_MAX_EPISODES;
use crate::episode::{DurationUnit, EntityRecord, Episode};
use crate::error::{Result, SpellError};

pub const DEFAULT_LABEL: &str = "episode";
pub const DEFAULT_ID_COLUMN: &str = "patient_id";
pub const DEFAULT_OUTPUT_COLUMN: &str = "first_spell_duration_days";
pub const SPELL_COUNT_COLUMN: &str = "spell_count";

/// Cell values read as missing in addition to the empty string.
const MISSING_MARKERS: [&str; 5] = ["NA", "na", "nan", "NaN", "null"];

/// Column naming for one episode source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    label: String,
    id_column: String,
    output_column: String,
    episodes: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            output_column: DEFAULT_OUTPUT_COLUMN.to_string(),
            episodes: DEFAULT_MAX_EPISODES,
        }
    }
}

impl TableLayout {
    /// Start a layout for episode columns named `<label>_<i>_...`.
    pub fn builder(label: impl Into<String>) -> TableLayoutBuilder {
        TableLayoutBuilder {
            layout: TableLayout {
                label: label.into(),
                ..TableLayout::default()
            },
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn output_column(&self) -> &str {
        &self.output_column
    }

    pub fn episodes(&self) -> usize {
        self.episodes
    }

    pub fn date_column(&self, slot: usize) -> String {
        format!("{}_{}_date", self.label, slot)
    }

    pub fn duration_column(&self, slot: usize, unit: DurationUnit) -> String {
        format!("{}_{}_duration_{}", self.label, slot, unit.column_suffix())
    }

    /// Column holding the resolved canonical duration in pass-through output.
    pub fn canonical_column(&self, slot: usize) -> String {
        format!("{}_{}_duration", self.label, slot)
    }
}

#[derive(Debug, Clone)]
pub struct TableLayoutBuilder {
    layout: TableLayout,
}

impl TableLayoutBuilder {
    pub fn id_column(mut self, name: impl Into<String>) -> Self {
        self.layout.id_column = name.into();
        self
    }

    pub fn output_column(mut self, name: impl Into<String>) -> Self {
        self.layout.output_column = name.into();
        self
    }

    pub fn episodes(mut self, count: usize) -> Self {
        self.layout.episodes = count;
        self
    }

    pub fn build(self) -> Result<TableLayout> {
        let layout = self.layout;
        if layout.label.trim().is_empty() {
            return Err(SpellError::InvalidConfig(
                "episode label must not be empty".to_string(),
            ));
        }
        if layout.id_column.trim().is_empty() || layout.output_column.trim().is_empty() {
            return Err(SpellError::InvalidConfig(
                "id and output column names must not be empty".to_string(),
            ));
        }
        if layout.episodes == 0 {
            return Err(SpellError::InvalidConfig(
                "episode count must be at least 1".to_string(),
            ));
        }
        Ok(layout)
    }
}

/// A parsed cohort file. Raw rows are kept for pass-through output.
#[derive(Debug, Clone)]
pub struct InputTable {
    pub headers: Vec<String>,
    pub records: Vec<EntityRecord>,
    rows: Vec<csv::StringRecord>,
}

/// Column positions for one slot.
struct SlotColumns {
    date: usize,
    units: [(DurationUnit, Option<usize>); 3],
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || MISSING_MARKERS.contains(&cell)
}

fn parse_date(cell: &str, row: usize, column: &str) -> Result<Option<NaiveDate>> {
    let cell = cell.trim();
    if is_missing(cell) {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(cell, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .map(|dt| Some(dt.date()))
        .ok_or_else(|| SpellError::MalformedInput {
            row,
            message: format!("invalid date '{}' in column {}", cell, column),
        })
}

fn parse_number(cell: &str, row: usize, column: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    if is_missing(cell) {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| SpellError::MalformedInput {
            row,
            message: format!("invalid number '{}' in column {}", cell, column),
        })
}

/// Parse a cohort CSV.
///
/// The id column and every slot's date column are required; a missing unit
/// column reads as "never recorded". Empty or duplicate identifiers and rows
/// with the wrong field count fail the whole table.
pub fn read_table<R: Read>(reader: R, layout: &TableLayout) -> Result<InputTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    let index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let require = |name: &str| {
        index
            .get(name)
            .copied()
            .ok_or_else(|| SpellError::MissingColumn(name.to_string()))
    };

    let id_idx = require(layout.id_column())?;
    let slots: Vec<SlotColumns> = (1..=layout.episodes())
        .map(|slot| -> Result<SlotColumns> {
            Ok(SlotColumns {
                date: require(&layout.date_column(slot))?,
                units: DurationUnit::ALL.map(|unit| {
                    (
                        unit,
                        index.get(layout.duration_column(slot, unit).as_str()).copied(),
                    )
                }),
            })
        })
        .collect::<Result<_>>()?;

    let mut records = Vec::new();
    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    for (n, row) in csv_reader.records().enumerate() {
        let row_number = n + 1;
        let row = row.map_err(|err| {
            if err.is_io_error() {
                SpellError::Csv(err)
            } else {
                SpellError::MalformedInput {
                    row: row_number,
                    message: err.to_string(),
                }
            }
        })?;

        let entity_id = row.get(id_idx).unwrap_or_default().trim().to_string();
        if entity_id.is_empty() {
            return Err(SpellError::MalformedInput {
                row: row_number,
                message: format!("empty identifier in column {}", layout.id_column()),
            });
        }
        if !seen.insert(entity_id.clone()) {
            return Err(SpellError::MalformedInput {
                row: row_number,
                message: format!("duplicate identifier '{}'", entity_id),
            });
        }

        let mut episodes = Vec::with_capacity(slots.len());
        for (i, columns) in slots.iter().enumerate() {
            let slot = i + 1;
            let mut episode = Episode {
                start: parse_date(
                    row.get(columns.date).unwrap_or_default(),
                    row_number,
                    &layout.date_column(slot),
                )?,
                ..Episode::default()
            };
            for (unit, idx) in columns.units {
                if let Some(idx) = idx {
                    let value = parse_number(
                        row.get(idx).unwrap_or_default(),
                        row_number,
                        &layout.duration_column(slot, unit),
                    )?;
                    episode.set_raw(unit, value);
                }
            }
            episodes.push(episode);
        }

        records.push(EntityRecord::new(entity_id, episodes));
        rows.push(row);
    }

    Ok(InputTable {
        headers,
        records,
        rows,
    })
}

/// Which columns [`write_table`] emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Carry every input column through, replacing raw unit columns with one
    /// canonical duration column per slot.
    pub keep_columns: bool,
    /// Append the number of merged spells per entity.
    pub spell_count: bool,
}

fn format_days(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write one output row per input entity, in input order.
pub fn write_table<W: Write>(
    writer: W,
    layout: &TableLayout,
    input: &InputTable,
    results: &[EntityResult],
    options: OutputOptions,
) -> Result<()> {
    if results.len() != input.records.len() {
        return Err(SpellError::MalformedInput {
            row: results.len().min(input.records.len()) + 1,
            message: format!(
                "{} results for {} input rows",
                results.len(),
                input.records.len()
            ),
        });
    }

    let raw_unit_columns: HashSet<String> = (1..=layout.episodes())
        .flat_map(|slot| DurationUnit::ALL.map(|unit| layout.duration_column(slot, unit)))
        .collect();
    let kept: Vec<usize> = if options.keep_columns {
        input
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !raw_unit_columns.contains(h.as_str()))
            .map(|(i, _)| i)
            .collect()
    } else {
        Vec::new()
    };

    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = Vec::new();
    if options.keep_columns {
        header.extend(kept.iter().map(|&i| input.headers[i].clone()));
        header.extend((1..=layout.episodes()).map(|slot| layout.canonical_column(slot)));
    } else {
        header.push(layout.id_column().to_string());
    }
    header.push(layout.output_column().to_string());
    if options.spell_count {
        header.push(SPELL_COUNT_COLUMN.to_string());
    }
    csv_writer.write_record(&header)?;

    for (row, result) in input.rows.iter().zip(results) {
        let mut out: Vec<String> = Vec::with_capacity(header.len());
        if options.keep_columns {
            out.extend(kept.iter().map(|&i| row.get(i).unwrap_or_default().to_string()));
            out.extend(
                (0..layout.episodes())
                    .map(|i| format_days(result.canonical_durations.get(i).copied().flatten())),
            );
        } else {
            out.push(result.entity_id.clone());
        }
        out.push(
            result
                .first_spell_duration_days
                .map(|d| d.to_string())
                .unwrap_or_default(),
        );
        if options.spell_count {
            out.push(result.spell_count.to_string());
        }
        csv_writer.write_record(&out)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write the per-entity results as a pretty-printed JSON array.
pub fn write_json<W: Write>(mut writer: W, results: &[EntityResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.flush()?;
    Ok(())
}
