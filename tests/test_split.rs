use chrono::{Duration, NaiveDate};
use demand_forecast::split::chronological_split;
use demand_forecast::DailySeries;
use rstest::rstest;

fn flat_series(days: usize) -> DailySeries {
    let start: NaiveDate = "2024-01-01".parse().unwrap();
    (0..days)
        .map(|i| (start + Duration::days(i as i64), 10.0 + i as f64))
        .collect()
}

#[rstest]
#[case(100, 80, 20)]
#[case(10, 8, 2)]
#[case(9, 7, 2)]
#[case(8, 7, 1)]
#[case(7, 7, 0)]
fn test_split_sizes(#[case] total: usize, #[case] train: usize, #[case] test: usize) {
    let series = flat_series(total);
    let split = chronological_split(&series, 0.8, 7);

    assert_eq!(split.train.len(), train);
    assert_eq!(split.test.len(), test);
    assert_eq!(split.train.len() + split.test.len(), series.len());
}

#[test]
fn test_split_is_chronological() {
    let series = flat_series(50);
    let split = chronological_split(&series, 0.8, 7);

    let last_train = split.train.last_date().unwrap();
    for test_date in split.test.dates() {
        assert!(last_train < test_date);
    }
}

#[test]
fn test_split_preserves_values() {
    let series = flat_series(20);
    let split = chronological_split(&series, 0.8, 7);

    let mut recombined: Vec<f64> = split.train.values();
    recombined.extend(split.test.values());
    assert_eq!(recombined, series.values());
}
