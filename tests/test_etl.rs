use chrono::NaiveDate;
use demand_forecast::etl::{extract, load, transform};
use demand_forecast::{DailySeries, ForecastError, Transaction};
use pretty_assertions::assert_eq;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn records(pairs: &[(&str, f64)]) -> Vec<Transaction> {
    pairs
        .iter()
        .map(|(d, q)| Transaction::new(date(d), *q))
        .collect()
}

#[test]
fn test_extract_empty_input() {
    let result = extract(&[]);
    assert!(matches!(result, Err(ForecastError::EmptyInput)));
}

#[test]
fn test_extract_sorts_by_date() {
    let rows = extract(&records(&[
        ("2024-01-03", 5.0),
        ("2024-01-01", 1.0),
        ("2024-01-02", 3.0),
    ]))
    .unwrap();

    let dates: Vec<NaiveDate> = rows.iter().map(|t| t.date).collect();
    assert_eq!(
        dates,
        vec![date("2024-01-01"), date("2024-01-02"), date("2024-01-03")]
    );
}

#[test]
fn test_transform_aggregates_same_day() {
    let series = transform(
        &records(&[
            ("2024-01-01", 5.0),
            ("2024-01-01", 7.0),
            ("2024-01-02", 3.0),
        ]),
        3.0,
    );

    assert_eq!(series.len(), 2);
    assert_eq!(series.get(date("2024-01-01")), Some(12.0));
    assert_eq!(series.get(date("2024-01-02")), Some(3.0));
}

#[test]
fn test_transform_fills_gaps_forward() {
    let series = transform(
        &records(&[
            ("2024-01-01", 10.0),
            ("2024-01-02", 12.0),
            ("2024-01-04", 8.0),
        ]),
        3.0,
    );

    assert_eq!(series.len(), 4);
    assert_eq!(series.get(date("2024-01-03")), Some(12.0));
    assert_eq!(series.first_date(), Some(date("2024-01-01")));
    assert_eq!(series.last_date(), Some(date("2024-01-04")));
}

#[test]
fn test_transform_covers_every_day_in_range() {
    let series = transform(
        &records(&[("2024-01-01", 4.0), ("2024-01-10", 6.0)]),
        3.0,
    );

    assert_eq!(series.len(), 10);
    let dates = series.dates();
    for pair in dates.windows(2) {
        assert_eq!((pair[1] - pair[0]).num_days(), 1);
    }
}

#[test]
fn test_transform_clips_extreme_outlier() {
    let mut rows = Vec::new();
    for i in 0..30 {
        rows.push((format!("2024-01-{:02}", i + 1), 10.0));
    }
    let mut txs: Vec<Transaction> = rows
        .iter()
        .map(|(d, q)| Transaction::new(date(d), *q))
        .collect();
    txs.push(Transaction::new(date("2024-01-31"), 1000.0));

    let series = transform(&txs, 3.0);

    let clipped = series.get(date("2024-01-31")).unwrap();
    assert!(clipped < 1000.0);
    assert_eq!(series.get(date("2024-01-15")), Some(10.0));
}

#[test]
fn test_transform_clips_negative_to_zero() {
    let series = transform(
        &records(&[
            ("2024-01-01", 5.0),
            ("2024-01-02", -4.0),
            ("2024-01-03", 6.0),
        ]),
        3.0,
    );

    assert_eq!(series.get(date("2024-01-02")), Some(0.0));
}

#[test]
fn test_transform_is_idempotent() {
    let series = transform(
        &records(&[
            ("2024-01-01", 10.0),
            ("2024-01-02", 12.0),
            ("2024-01-05", 14.0),
            ("2024-01-06", 11.0),
            ("2024-01-08", 13.0),
        ]),
        3.0,
    );

    let reapplied_input: Vec<Transaction> = series
        .iter()
        .map(|(d, q)| Transaction::new(d, q))
        .collect();
    let reapplied = transform(&reapplied_input, 3.0);

    assert_eq!(series, reapplied);
}

#[test]
fn test_transform_is_idempotent_with_outlier() {
    // A >3-sigma spike, plus a gap so the fill runs too
    let mut txs: Vec<Transaction> = (1..=30)
        .filter(|i| *i != 20)
        .map(|i| Transaction::new(date(&format!("2024-01-{:02}", i)), 10.0))
        .collect();
    txs.push(Transaction::new(date("2024-01-31"), 1000.0));

    let once = transform(&txs, 3.0);
    let reapplied_input: Vec<Transaction> = once
        .iter()
        .map(|(d, q)| Transaction::new(d, q))
        .collect();
    let twice = transform(&reapplied_input, 3.0);

    assert!(once.get(date("2024-01-31")).unwrap() < 1000.0);
    assert_eq!(once, twice);
}

#[test]
fn test_load_passes_long_series_through() {
    let series = transform(
        &records(&[("2024-01-01", 4.0), ("2024-01-10", 6.0)]),
        3.0,
    );
    let loaded = load(series.clone(), 7);

    assert!(!loaded.padded);
    assert_eq!(loaded.series, series);
}

#[test]
fn test_load_pads_front_with_mean() {
    let series = DailySeries::from_pairs([
        (date("2024-01-01"), 10.0),
        (date("2024-01-02"), 12.0),
        (date("2024-01-03"), 11.0),
        (date("2024-01-04"), 13.0),
        (date("2024-01-05"), 14.0),
    ]);
    let mean = series.mean();

    let loaded = load(series, 7);

    assert!(loaded.padded);
    assert_eq!(loaded.series.len(), 7);
    assert_eq!(loaded.series.first_date(), Some(date("2023-12-30")));
    assert_eq!(loaded.series.get(date("2023-12-30")), Some(mean));
    assert_eq!(loaded.series.get(date("2023-12-31")), Some(mean));
    // original points untouched
    assert_eq!(loaded.series.get(date("2024-01-05")), Some(14.0));
}
