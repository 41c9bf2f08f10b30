//! Seasonal-naive baseline: historical average for the same seasonal
//! position, day-of-week by default

use crate::error::{ForecastError, Result};
use crate::models::{ForecastBands, ForecastModel, TrainedForecastModel};
use crate::series::DailySeries;
use chrono::{Datelike, Duration, NaiveDate};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// z-score for the 95% interval
const Z_95: f64 = 1.96;

/// Which seasonal position a date is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalCycle {
    /// Group by weekday, a 7-day cycle
    DayOfWeek,
    /// Group by day of month
    DayOfMonth,
}

impl SeasonalCycle {
    fn position(&self, date: NaiveDate) -> u32 {
        match self {
            SeasonalCycle::DayOfWeek => date.weekday().num_days_from_monday(),
            SeasonalCycle::DayOfMonth => date.day(),
        }
    }
}

/// Per-position statistics gathered from the training window
#[derive(Debug, Clone, Copy)]
struct GroupStats {
    mean: f64,
    std: f64,
    count: usize,
}

/// Seasonal-naive model
#[derive(Debug, Clone)]
pub struct SeasonalNaiveModel {
    /// Name of the model
    name: String,
    /// Seasonal grouping
    cycle: SeasonalCycle,
}

/// Trained seasonal-naive model
#[derive(Debug, Clone)]
pub struct TrainedSeasonalNaiveModel {
    /// Name of the model
    name: String,
    /// Seasonal grouping
    cycle: SeasonalCycle,
    /// Statistics per seasonal position
    groups: BTreeMap<u32, GroupStats>,
    /// Overall training mean, the fallback for unseen positions
    overall_mean: f64,
    /// Overall training standard deviation, the fallback band width
    overall_std: f64,
    /// Last training date, forecasts start the day after
    last_date: NaiveDate,
}

impl SeasonalNaiveModel {
    /// Create a model grouping by day-of-week
    pub fn new() -> Self {
        Self::with_cycle(SeasonalCycle::DayOfWeek)
    }

    /// Create a model with an explicit seasonal cycle
    pub fn with_cycle(cycle: SeasonalCycle) -> Self {
        Self {
            name: match cycle {
                SeasonalCycle::DayOfWeek => "Seasonal Naive (day-of-week)".to_string(),
                SeasonalCycle::DayOfMonth => "Seasonal Naive (day-of-month)".to_string(),
            },
            cycle,
        }
    }
}

impl Default for SeasonalNaiveModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastModel for SeasonalNaiveModel {
    type Trained = TrainedSeasonalNaiveModel;

    fn train(&self, series: &DailySeries) -> Result<TrainedSeasonalNaiveModel> {
        if series.is_empty() {
            return Err(ForecastError::InsufficientData(
                "seasonal naive needs at least one training day".to_string(),
            ));
        }

        let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (date, value) in series.iter() {
            buckets
                .entry(self.cycle.position(date))
                .or_default()
                .push(value);
        }

        let groups = buckets
            .into_iter()
            .map(|(position, values)| {
                let mean = values.iter().mean();
                let std = if values.len() < 2 {
                    0.0
                } else {
                    values.iter().std_dev()
                };
                (
                    position,
                    GroupStats {
                        mean,
                        std,
                        count: values.len(),
                    },
                )
            })
            .collect();

        Ok(TrainedSeasonalNaiveModel {
            name: self.name.clone(),
            cycle: self.cycle,
            groups,
            overall_mean: series.mean(),
            overall_std: series.std_dev(),
            last_date: series.last_date().ok_or_else(|| {
                ForecastError::InsufficientData("empty training series".to_string())
            })?,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSeasonalNaiveModel {
    /// Point prediction and band width for one future date
    fn predict_date(&self, date: NaiveDate) -> (f64, f64) {
        match self.groups.get(&self.cycle.position(date)) {
            Some(stats) if stats.count >= 2 => (stats.mean, stats.std),
            Some(stats) => (stats.mean, self.overall_std),
            None => (self.overall_mean, self.overall_std),
        }
    }
}

impl TrainedForecastModel for TrainedSeasonalNaiveModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastBands> {
        let mut values = Vec::with_capacity(horizon);
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for offset in 1..=horizon as i64 {
            let date = self.last_date + Duration::days(offset);
            let (point, std) = self.predict_date(date);
            values.push(point);
            lower.push(point - Z_95 * std);
            upper.push(point + Z_95 * std);
        }
        Ok(ForecastBands::new(values, lower, upper)?.sanitize())
    }

    fn forecast_over(&self, test: &DailySeries) -> Result<Vec<f64>> {
        Ok(test
            .dates()
            .into_iter()
            .map(|date| self.predict_date(date).0)
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
