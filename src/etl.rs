//! ETL stages: extract raw records, transform to a clean daily series,
//! load-validate to a minimum usable length.
//!
//! Every stage is a pure function from its input to a fresh value; nothing is
//! mutated in place, and applying [`transform`] to its own output changes
//! nothing: the outlier clip runs after gap filling and iterates until the
//! clipped series satisfies its own bound.

use crate::error::{ForecastError, Result};
use crate::series::{DailySeries, Transaction};
use chrono::{Duration, NaiveDate};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Validated output of the load stage
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    /// The daily series, at least the configured minimum length
    pub series: DailySeries,
    /// Whether the front of the series was padded to reach that length
    pub padded: bool,
}

/// Return the records sorted by date, failing on an empty input.
///
/// The caller has already scoped the records to one location/item and a
/// lookback window; this stage only gives them a stable order.
pub fn extract(records: &[Transaction]) -> Result<Vec<Transaction>> {
    if records.is_empty() {
        return Err(ForecastError::EmptyInput);
    }
    let mut rows = records.to_vec();
    rows.sort_by_key(|t| t.date);
    Ok(rows)
}

/// Clean and aggregate raw records into one gap-free daily series.
///
/// Same-day records are summed, negative values are clipped to zero, every
/// calendar day between the earliest and latest observed date is filled in
/// (forward-fill from the last known value, series mean for any leading gap),
/// and values above `mean + outlier_sigma * std` are clipped down until the
/// clipped series satisfies its own bound. Idempotent on its own output.
pub fn transform(rows: &[Transaction], outlier_sigma: f64) -> DailySeries {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for t in rows {
        *daily.entry(t.date).or_insert(0.0) += t.quantity;
    }
    if daily.is_empty() {
        return DailySeries::new();
    }

    // Negative sales are impossible in this domain
    for v in daily.values_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }

    let fill_mean = daily.values().mean();
    let first = *daily.keys().next().unwrap_or(&NaiveDate::MIN);
    let last = *daily.keys().next_back().unwrap_or(&NaiveDate::MIN);

    let mut filled: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut prev: Option<f64> = None;
    let mut date = first;
    while date <= last {
        let value = daily.get(&date).copied().or(prev).unwrap_or(fill_mean);
        filled.insert(date, value);
        prev = Some(value);
        date += Duration::days(1);
    }

    clip_outliers(&mut filled, outlier_sigma);
    DailySeries::from_pairs(filled)
}

/// Clip values above `mean + outlier_sigma * std`, iterated to a fixpoint.
///
/// Each clipping pass lowers the cap for the next, so the loop runs until no
/// value exceeds the cap of the series it belongs to; the values are monotone
/// non-increasing and bounded below, so the loop terminates. A series that
/// already satisfies its own bound is left untouched.
fn clip_outliers(daily: &mut BTreeMap<NaiveDate, f64>, outlier_sigma: f64) {
    if daily.len() < 2 {
        return;
    }
    loop {
        let mean = daily.values().mean();
        let std = daily.values().std_dev();
        if std <= 0.0 {
            return;
        }
        let cap = mean + outlier_sigma * std;
        let mut clipped = false;
        for v in daily.values_mut() {
            if *v > cap {
                *v = cap;
                clipped = true;
            }
        }
        if !clipped {
            return;
        }
    }
}

/// Validate the series has at least `min_len` points, front-padding with the
/// series mean when it does not. Never truncates.
pub fn load(series: DailySeries, min_len: usize) -> LoadedSeries {
    if series.is_empty() || series.len() >= min_len {
        return LoadedSeries {
            series,
            padded: false,
        };
    }

    let mean = series.mean();
    let mut padded = series.clone();
    let mut date = match series.first_date() {
        Some(d) => d,
        None => {
            return LoadedSeries {
                series,
                padded: false,
            }
        }
    };
    while padded.len() < min_len {
        date -= Duration::days(1);
        padded.insert(date, mean);
    }
    LoadedSeries {
        series: padded,
        padded: true,
    }
}
