//! Tests for the cohort CSV codec.

use chrono::NaiveDate;
use spell_engine::{
    read_table, reconcile_batch, write_json, write_table, OutputOptions, SpellConfig, SpellError,
    TableLayout,
};

fn layout(label: &str, episodes: usize) -> TableLayout {
    TableLayout::builder(label).episodes(episodes).build().unwrap()
}

/// Header for a single-slot table under the `sick_note` label.
const ONE_SLOT_HEADER: &str = "patient_id,age,sick_note_1_date,sick_note_1_duration_days,sick_note_1_duration_weeks,sick_note_1_duration_months";

fn run(csv: &str, layout: &TableLayout, options: OutputOptions) -> String {
    let input = read_table(csv.as_bytes(), layout).unwrap();
    let config = SpellConfig::new(14, layout.episodes()).unwrap();
    let results = reconcile_batch(&input.records, &config);
    let mut out = Vec::new();
    write_table(&mut out, layout, &input, &results, options).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn column_names_follow_label_and_slot() {
    let l = layout("sick_note", 5);
    assert_eq!(l.date_column(3), "sick_note_3_date");
    assert_eq!(
        l.duration_column(3, spell_engine::DurationUnit::Weeks),
        "sick_note_3_duration_weeks"
    );
    assert_eq!(l.canonical_column(2), "sick_note_2_duration");
}

#[test]
fn default_layout_uses_episode_label() {
    let l = TableLayout::default();
    assert_eq!(l.label(), "episode");
    assert_eq!(l.id_column(), "patient_id");
    assert_eq!(l.output_column(), "first_spell_duration_days");
    assert_eq!(l.episodes(), 5);
}

#[test]
fn builder_rejects_empty_label() {
    assert!(matches!(
        TableLayout::builder("  ").build(),
        Err(SpellError::InvalidConfig(_))
    ));
}

#[test]
fn reads_dates_and_sentinels() {
    let csv = format!(
        "{}\n1,40,2021-01-01,0,2,0\n2,51,,0,0,0\n3,33,2021-02-03 00:00:00,NA,,1\n",
        ONE_SLOT_HEADER
    );
    let table = read_table(csv.as_bytes(), &layout("sick_note", 1)).unwrap();

    assert_eq!(table.records.len(), 3);
    let first = &table.records[0].episodes[0];
    assert_eq!(first.start, NaiveDate::from_ymd_opt(2021, 1, 1));
    assert_eq!(first.duration_weeks, Some(2.0));
    // Zero is read verbatim; the normalizer owns its meaning.
    assert_eq!(first.duration_days, Some(0.0));

    assert!(table.records[1].episodes[0].is_absent());

    let third = &table.records[2].episodes[0];
    assert_eq!(third.start, NaiveDate::from_ymd_opt(2021, 2, 3));
    assert_eq!(third.duration_days, None);
    assert_eq!(third.duration_months, Some(1.0));
}

#[test]
fn missing_unit_column_reads_as_unrecorded() {
    let csv = "patient_id,episode_1_date,episode_1_duration_days\nx,2021-01-01,10\n";
    let table = read_table(csv.as_bytes(), &layout("episode", 1)).unwrap();
    assert_eq!(table.records[0].episodes[0].duration_weeks, None);
    assert_eq!(table.records[0].episodes[0].duration_days, Some(10.0));
}

#[test]
fn missing_id_column_is_fatal() {
    let csv = "person,episode_1_date\nx,2021-01-01\n";
    let err = read_table(csv.as_bytes(), &layout("episode", 1)).unwrap_err();
    assert!(matches!(err, SpellError::MissingColumn(ref c) if c == "patient_id"));
}

#[test]
fn missing_date_column_is_fatal() {
    let csv = "patient_id,episode_1_date\nx,2021-01-01\n";
    let err = read_table(csv.as_bytes(), &layout("episode", 2)).unwrap_err();
    assert!(matches!(err, SpellError::MissingColumn(ref c) if c == "episode_2_date"));
}

#[test]
fn empty_identifier_is_fatal() {
    let csv = "patient_id,episode_1_date\nx,2021-01-01\n ,2021-01-02\n";
    let err = read_table(csv.as_bytes(), &layout("episode", 1)).unwrap_err();
    assert!(matches!(err, SpellError::MalformedInput { row: 2, .. }));
}

#[test]
fn duplicate_identifier_is_fatal() {
    let csv = "patient_id,episode_1_date\nx,2021-01-01\nx,2021-01-02\n";
    let err = read_table(csv.as_bytes(), &layout("episode", 1)).unwrap_err();
    assert!(matches!(err, SpellError::MalformedInput { row: 2, .. }));
}

#[test]
fn unparseable_cells_are_fatal() {
    let bad_date = "patient_id,episode_1_date\nx,01/02/2021\n";
    assert!(matches!(
        read_table(bad_date.as_bytes(), &layout("episode", 1)),
        Err(SpellError::MalformedInput { row: 1, .. })
    ));

    let bad_number = "patient_id,episode_1_date,episode_1_duration_days\nx,2021-01-01,ten\n";
    assert!(matches!(
        read_table(bad_number.as_bytes(), &layout("episode", 1)),
        Err(SpellError::MalformedInput { row: 1, .. })
    ));
}

#[test]
fn ragged_row_is_malformed_input() {
    let csv = "patient_id,episode_1_date\nx,2021-01-01\ny,2021-01-02,extra\n";
    assert!(matches!(
        read_table(csv.as_bytes(), &layout("episode", 1)),
        Err(SpellError::MalformedInput { row: 2, .. })
    ));
}

#[test]
fn writes_one_row_per_entity() {
    let csv = format!(
        "{}\n1,40,2021-01-01,10,0,0\n2,51,,0,0,0\n",
        ONE_SLOT_HEADER
    );
    let out = run(&csv, &layout("sick_note", 1), OutputOptions::default());
    assert_eq!(out, "patient_id,first_spell_duration_days\n1,10\n2,\n");
}

#[test]
fn keep_columns_replaces_raw_units_with_canonical() {
    let csv = format!(
        "{}\n1,40,2021-01-01,10,1,0\n",
        ONE_SLOT_HEADER
    );
    let options = OutputOptions {
        keep_columns: true,
        spell_count: true,
    };
    let out = run(&csv, &layout("sick_note", 1), options);
    assert_eq!(
        out,
        "patient_id,age,sick_note_1_date,sick_note_1_duration,first_spell_duration_days,spell_count\n\
         1,40,2021-01-01,8.5,8,1\n"
    );
}

#[test]
fn custom_output_column_name() {
    let l = TableLayout::builder("sick_note")
        .episodes(1)
        .output_column("first_sick_note_duration")
        .build()
        .unwrap();
    let csv = format!("{}\n1,40,2021-01-01,0,0,1\n", ONE_SLOT_HEADER);
    let out = run(&csv, &l, OutputOptions::default());
    assert_eq!(out, "patient_id,first_sick_note_duration\n1,30\n");
}

#[test]
fn json_output_lists_results() {
    let csv = "patient_id,episode_1_date,episode_1_duration_days\nx,2021-01-01,10\n";
    let l = layout("episode", 1);
    let input = read_table(csv.as_bytes(), &l).unwrap();
    let results = reconcile_batch(&input.records, &SpellConfig::new(14, 1).unwrap());

    let mut out = Vec::new();
    write_json(&mut out, &results).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value[0]["entity_id"], "x");
    assert_eq!(value[0]["first_spell_duration_days"], 10);
    assert!(value[0]["anomaly"].is_null());
}
