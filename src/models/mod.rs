//! Forecasting models for daily demand series

use crate::error::{ForecastError, Result};
use crate::series::DailySeries;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::str::FromStr;

pub mod arima;
pub mod ensemble;
pub mod seasonal;

pub use arima::{ArimaModel, TrainedArimaModel};
pub use ensemble::{EnsembleModel, TrainedEnsembleModel};
pub use seasonal::{SeasonalCycle, SeasonalNaiveModel, TrainedSeasonalNaiveModel};

/// A forward-looking forecast with paired confidence bounds
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBands {
    /// Point predictions, one per future day
    pub values: Vec<f64>,
    /// Lower confidence bounds, same length as `values`
    pub lower: Vec<f64>,
    /// Upper confidence bounds, same length as `values`
    pub upper: Vec<f64>,
}

impl ForecastBands {
    /// Create a new forecast, validating the three sequences share a length
    pub fn new(values: Vec<f64>, lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if values.len() != lower.len() || values.len() != upper.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Bound lengths ({}, {}) don't match values length ({})",
                lower.len(),
                upper.len(),
                values.len()
            )));
        }
        Ok(Self {
            values,
            lower,
            upper,
        })
    }

    /// Number of forecast days
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    /// Enforce `0 <= lower <= point <= upper` point-wise.
    ///
    /// Short-series fits can produce crossed bounds or negative points; the
    /// point is clamped at zero and a violating bound is pulled to the point
    /// rather than discarded.
    pub fn sanitize(mut self) -> Self {
        for i in 0..self.values.len() {
            if !self.values[i].is_finite() || self.values[i] < 0.0 {
                self.values[i] = self.values[i].max(0.0);
                if !self.values[i].is_finite() {
                    self.values[i] = 0.0;
                }
            }
            if !self.lower[i].is_finite() {
                self.lower[i] = self.values[i];
            }
            if !self.upper[i].is_finite() {
                self.upper[i] = self.values[i];
            }
            self.lower[i] = self.lower[i].max(0.0).min(self.values[i]);
            self.upper[i] = self.upper[i].max(self.values[i]);
        }
        self
    }
}

/// Forecast model that can be fitted to a daily training series
pub trait ForecastModel: Debug {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Fit the model to the training series
    fn train(&self, series: &DailySeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// A fitted forecaster
pub trait TrainedForecastModel: Debug {
    /// Forecast the next `horizon` days past the end of the training series
    fn forecast(&self, horizon: usize) -> Result<ForecastBands>;

    /// Point predictions for a held-out range immediately following the
    /// training series, used for evaluation
    fn forecast_over(&self, test: &DailySeries) -> Result<Vec<f64>>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// The closed set of trainable model strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// ARIMA with AIC-selected orders
    Arima,
    /// Seeded bagged-regression-tree ensemble
    Ensemble,
    /// Seasonal-naive baseline
    Seasonal,
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "arima" => Ok(ModelKind::Arima),
            "rf" | "random_forest" | "randomforest" | "ensemble" => Ok(ModelKind::Ensemble),
            "seasonal" | "seasonal_naive" | "seasonalnaive" => Ok(ModelKind::Seasonal),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown model type: {}",
                other
            ))),
        }
    }
}

/// Model label carried on a forecast result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    /// ARIMA grid-search winner
    #[serde(rename = "ARIMA")]
    Arima,
    /// Regression-tree ensemble
    #[serde(rename = "RF")]
    Ensemble,
    /// Seasonal-naive baseline
    #[serde(rename = "Seasonal")]
    Seasonal,
    /// Degraded flat projection, no model was fitted
    #[serde(rename = "estimated")]
    Estimated,
}

impl From<ModelKind> for ModelType {
    fn from(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Arima => ModelType::Arima,
            ModelKind::Ensemble => ModelType::Ensemble,
            ModelKind::Seasonal => ModelType::Seasonal,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ModelType::Arima => "ARIMA",
            ModelType::Ensemble => "RF",
            ModelType::Seasonal => "Seasonal",
            ModelType::Estimated => "estimated",
        };
        write!(f, "{}", label)
    }
}

/// A fitted forecaster, tagged by strategy
#[derive(Debug, Clone)]
pub enum TrainedModel {
    /// Fitted ARIMA model
    Arima(TrainedArimaModel),
    /// Fitted regression-tree ensemble
    Ensemble(TrainedEnsembleModel),
    /// Fitted seasonal-naive model
    Seasonal(TrainedSeasonalNaiveModel),
}

impl TrainedModel {
    /// The strategy this forecaster was fitted with
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::Arima(_) => ModelKind::Arima,
            TrainedModel::Ensemble(_) => ModelKind::Ensemble,
            TrainedModel::Seasonal(_) => ModelKind::Seasonal,
        }
    }
}

impl TrainedForecastModel for TrainedModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastBands> {
        match self {
            TrainedModel::Arima(m) => m.forecast(horizon),
            TrainedModel::Ensemble(m) => m.forecast(horizon),
            TrainedModel::Seasonal(m) => m.forecast(horizon),
        }
    }

    fn forecast_over(&self, test: &DailySeries) -> Result<Vec<f64>> {
        match self {
            TrainedModel::Arima(m) => m.forecast_over(test),
            TrainedModel::Ensemble(m) => m.forecast_over(test),
            TrainedModel::Seasonal(m) => m.forecast_over(test),
        }
    }

    fn name(&self) -> &str {
        match self {
            TrainedModel::Arima(m) => m.name(),
            TrainedModel::Ensemble(m) => m.name(),
            TrainedModel::Seasonal(m) => m.name(),
        }
    }
}
