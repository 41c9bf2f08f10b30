//! # Demand Forecast
//!
//! A Rust library for per-(location, item) daily demand forecasting from
//! sales transaction history.
//!
//! ## Features
//!
//! - ETL from raw dated transactions to a clean, gap-free daily series
//! - Chronological train/test splitting with held-out evaluation
//! - Forecasting models (ARIMA with AIC order selection, a seeded
//!   regression-tree ensemble, a seasonal-naive baseline)
//! - Auto-selection by held-out accuracy, with an explicit fallback policy
//!   that always returns a usable forecast
//! - Confidence bounds and data-source provenance on every result
//!
//! ## Quick Start
//!
//! ```
//! use chrono::NaiveDate;
//! use demand_forecast::{ForecastPipeline, ForecastRequest, Transaction};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let records: Vec<Transaction> = (0..60)
//!     .map(|i| Transaction::new(start + chrono::Duration::days(i), 20.0))
//!     .collect();
//!
//! let pipeline = ForecastPipeline::with_defaults();
//! let request = ForecastRequest::new(Some("seasonal"), 7).unwrap();
//! let outcome = pipeline.run(&records, &request).unwrap();
//!
//! assert_eq!(outcome.forecast_values.len(), 7);
//! ```

pub mod error;
pub mod etl;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod series;
pub mod split;

// Re-export commonly used types
pub use crate::error::{ForecastError, Result};
pub use crate::metrics::ForecastMetrics;
pub use crate::models::{ForecastBands, ModelKind, ModelType};
pub use crate::pipeline::{
    DataSource, DataSourceKind, ForecastOutcome, ForecastPipeline, ForecastRequest,
    PipelineConfig, DEFAULT_LOOKBACK_DAYS,
};
pub use crate::series::{DailySeries, Transaction};
pub use crate::split::TrainTestSplit;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
