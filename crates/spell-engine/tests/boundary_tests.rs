//! Tests for spell boundary calculation.

use chrono::{NaiveDate, NaiveDateTime};
use spell_engine::boundary::{days_to_duration, spell_end, spell_end_opt, spell_length_days};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(0, 0, 0).unwrap()
}

#[test]
fn boundary_adds_duration_and_window() {
    // 2021-01-01 + 10 + 14 = 2021-01-25
    let end = spell_end(date(2021, 1, 1), Some(10.0), 14).unwrap();
    assert_eq!(end, midnight(2021, 1, 25));
}

#[test]
fn missing_duration_counts_as_zero() {
    let end = spell_end(date(2021, 1, 1), None, 14).unwrap();
    assert_eq!(end, midnight(2021, 1, 15));
}

#[test]
fn fractional_duration_keeps_sub_day_precision() {
    let end = spell_end(date(2021, 1, 1), Some(8.5), 14).unwrap();
    assert_eq!(end, date(2021, 1, 23).and_hms_opt(12, 0, 0).unwrap());
}

#[test]
fn boundary_crosses_month_and_year() {
    let end = spell_end(date(2020, 12, 20), Some(30.0), 14).unwrap();
    assert_eq!(end, midnight(2021, 2, 2));
}

#[test]
fn missing_start_propagates() {
    assert_eq!(spell_end_opt(None, Some(10.0), 14), None);
    assert!(spell_end_opt(Some(date(2021, 1, 1)), Some(10.0), 14).is_some());
}

#[test]
fn absurd_duration_is_out_of_range() {
    assert_eq!(spell_end(date(2021, 1, 1), Some(1e15), 14), None);
    assert_eq!(days_to_duration(f64::INFINITY), None);
}

#[test]
fn length_removes_window_once() {
    assert_eq!(spell_length_days(date(2021, 1, 1), midnight(2021, 2, 8), 14), 24);
}

#[test]
fn length_floors_partial_days() {
    let end = date(2021, 1, 23).and_hms_opt(12, 0, 0).unwrap();
    assert_eq!(spell_length_days(date(2021, 1, 1), end, 14), 8);
}

#[test]
fn length_floors_negative_partial_days() {
    // Half a day before the start is -1 whole day.
    let end = date(2020, 12, 31).and_hms_opt(12, 0, 0).unwrap();
    assert_eq!(spell_length_days(date(2021, 1, 1), end, 0), -1);
}
