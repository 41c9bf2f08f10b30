//! Daily time series types shared by every pipeline stage

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// A single dated sales record, scoped by the caller to one location and item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Calendar date of the sale
    pub date: NaiveDate,
    /// Quantity sold, non-negative
    pub quantity: f64,
}

impl Transaction {
    /// Create a new transaction record
    pub fn new(date: NaiveDate, quantity: f64) -> Self {
        Self { date, quantity }
    }
}

/// An ordered mapping from calendar date to daily quantity.
///
/// Dates are unique and iterate in ascending order. A series produced by the
/// transform stage additionally covers every day between its first and last
/// date with no gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl DailySeries {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from (date, quantity) pairs; later duplicates overwrite
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self {
            points: pairs.into_iter().collect(),
        }
    }

    /// Insert or replace the quantity for a date
    pub fn insert(&mut self, date: NaiveDate, quantity: f64) {
        self.points.insert(date, quantity);
    }

    /// Quantity for a date, if present
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    /// Number of days in the series
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Earliest date, if any
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    /// Latest date, if any
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    /// Dates in ascending order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.keys().copied().collect()
    }

    /// Quantities in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.values().copied().collect()
    }

    /// Iterate over (date, quantity) pairs in date order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, q)| (*d, *q))
    }

    /// Mean of the daily quantities, 0.0 for an empty series
    pub fn mean(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.values().mean()
    }

    /// Sample standard deviation of the daily quantities, 0.0 when fewer
    /// than two points
    pub fn std_dev(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.values().std_dev()
    }

    /// Split into two series at the given index: the first `at` days in date
    /// order, then the remainder
    pub fn split_at(&self, at: usize) -> (DailySeries, DailySeries) {
        let head = self.iter().take(at).collect::<BTreeMap<_, _>>();
        let tail = self.iter().skip(at).collect::<BTreeMap<_, _>>();
        (DailySeries { points: head }, DailySeries { points: tail })
    }
}

impl FromIterator<(NaiveDate, f64)> for DailySeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
