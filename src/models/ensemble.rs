//! Regression-ensemble model: bagged regression trees over calendar and lag
//! features
//!
//! Each tree is fitted on a bootstrap resample drawn from an explicitly
//! seeded RNG, so two fits with the same seed and data are bit-identical.
//! Tree ensembles carry no native forecast interval, so the bounds are
//! `point +/- 1.96 * residual_std` from the training residuals.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastBands, ForecastModel, TrainedForecastModel};
use crate::series::DailySeries;
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::statistics::Statistics;

/// Number of engineered features per day
const FEATURE_COUNT: usize = 9;
/// Days whose lag/rolling features are undefined and get dropped
const WARMUP_DAYS: usize = 30;
/// Minimum valid feature rows required after the warmup drop
const MIN_FEATURE_ROWS: usize = 10;
/// Multiplier approximating a 95% band around the point forecast
const BAND_Z: f64 = 1.96;

/// Bagged regression-tree ensemble with an explicit seed
#[derive(Debug, Clone)]
pub struct EnsembleModel {
    /// Name of the model
    name: String,
    /// Number of trees in the bag
    n_trees: usize,
    /// Maximum tree depth
    max_depth: usize,
    /// Minimum samples per leaf
    min_leaf: usize,
    /// RNG seed for bootstrap sampling
    seed: u64,
}

/// Trained regression-tree ensemble
#[derive(Debug, Clone)]
pub struct TrainedEnsembleModel {
    /// Name of the model
    name: String,
    /// The fitted trees
    trees: Vec<RegressionTree>,
    /// Sample standard deviation of the training residuals
    residual_std: f64,
    /// Training dates, kept for recursive feature construction
    dates: Vec<NaiveDate>,
    /// Training values, kept for recursive feature construction
    values: Vec<f64>,
}

impl EnsembleModel {
    /// Create an ensemble with the default shape and the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            name: "Regression Ensemble".to_string(),
            n_trees: 30,
            max_depth: 6,
            min_leaf: 2,
            seed,
        }
    }

    /// Create an ensemble with a custom shape
    pub fn with_shape(n_trees: usize, max_depth: usize, min_leaf: usize, seed: u64) -> Result<Self> {
        if n_trees == 0 || max_depth == 0 || min_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "Ensemble shape parameters must be positive".to_string(),
            ));
        }
        Ok(Self {
            name: "Regression Ensemble".to_string(),
            n_trees,
            max_depth,
            min_leaf,
            seed,
        })
    }
}

impl ForecastModel for EnsembleModel {
    type Trained = TrainedEnsembleModel;

    fn train(&self, series: &DailySeries) -> Result<TrainedEnsembleModel> {
        let dates = series.dates();
        let values = series.values();
        let n = values.len();

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for t in WARMUP_DAYS..n {
            rows.push(features(dates[t], &values, t));
            targets.push(values[t]);
        }
        if rows.len() < MIN_FEATURE_ROWS {
            return Err(ForecastError::InsufficientData(format!(
                "Ensemble needs at least {} feature rows after the {}-day warmup, got {}",
                MIN_FEATURE_ROWS,
                WARMUP_DAYS,
                rows.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            let sample: Vec<usize> = (0..rows.len())
                .map(|_| rng.gen_range(0..rows.len()))
                .collect();
            trees.push(RegressionTree::fit(
                &rows,
                &targets,
                &sample,
                self.max_depth,
                self.min_leaf,
            ));
        }

        let residuals: Vec<f64> = rows
            .iter()
            .zip(targets.iter())
            .map(|(row, target)| target - predict_bag(&trees, row))
            .collect();
        let residual_std = if residuals.len() < 2 {
            0.0
        } else {
            residuals.iter().std_dev()
        };

        Ok(TrainedEnsembleModel {
            name: self.name.clone(),
            trees,
            residual_std,
            dates,
            values,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedEnsembleModel {
    /// Recursive multi-step prediction: each step's forecast is appended to
    /// the history so the next step's lag features can be built from it
    fn predict_recursive(&self, future_dates: &[NaiveDate]) -> Vec<f64> {
        let mut values = self.values.clone();
        let mut predictions = Vec::with_capacity(future_dates.len());
        for &date in future_dates {
            let t = values.len();
            let row = features(date, &values, t);
            let point = predict_bag(&self.trees, &row).max(0.0);
            values.push(point);
            predictions.push(point);
        }
        predictions
    }
}

impl TrainedForecastModel for TrainedEnsembleModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastBands> {
        let last = self.dates.last().copied().ok_or_else(|| {
            ForecastError::ModelTraining("ensemble has no training history".to_string())
        })?;
        let future_dates: Vec<NaiveDate> = (1..=horizon as i64)
            .map(|offset| last + Duration::days(offset))
            .collect();

        let point = self.predict_recursive(&future_dates);
        let margin = BAND_Z * self.residual_std;
        let lower: Vec<f64> = point.iter().map(|p| p - margin).collect();
        let upper: Vec<f64> = point.iter().map(|p| p + margin).collect();
        Ok(ForecastBands::new(point, lower, upper)?.sanitize())
    }

    fn forecast_over(&self, test: &DailySeries) -> Result<Vec<f64>> {
        Ok(self.predict_recursive(&test.dates()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Engineered features for day `t`: day-of-week, day-of-month, month, year,
/// lag-1, lag-7, lag-30, rolling means over 7 and 30 days.
///
/// Requires `t >= WARMUP_DAYS` so every lag and window is defined.
fn features(date: NaiveDate, values: &[f64], t: usize) -> [f64; FEATURE_COUNT] {
    let roll7 = values[t - 7..t].iter().sum::<f64>() / 7.0;
    let roll30 = values[t - 30..t].iter().sum::<f64>() / 30.0;
    [
        date.weekday().num_days_from_monday() as f64,
        date.day() as f64,
        date.month() as f64,
        date.year() as f64,
        values[t - 1],
        values[t - 7],
        values[t - 30],
        roll7,
        roll30,
    ]
}

/// Mean prediction over the bag
fn predict_bag(trees: &[RegressionTree], row: &[f64; FEATURE_COUNT]) -> f64 {
    trees.iter().map(|tree| tree.predict(row)).sum::<f64>() / trees.len() as f64
}

/// A CART regression tree over the fixed feature set
#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl RegressionTree {
    fn fit(
        rows: &[[f64; FEATURE_COUNT]],
        targets: &[f64],
        sample: &[usize],
        max_depth: usize,
        min_leaf: usize,
    ) -> Self {
        let mut nodes = Vec::new();
        build_node(
            &mut nodes,
            rows,
            targets,
            sample.to_vec(),
            max_depth,
            min_leaf,
        );
        Self { nodes }
    }

    fn predict(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        let mut current = 0;
        loop {
            match &self.nodes[current] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if row[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Grow one node, returning its index; the root is always index 0
fn build_node(
    nodes: &mut Vec<TreeNode>,
    rows: &[[f64; FEATURE_COUNT]],
    targets: &[f64],
    indices: Vec<usize>,
    depth: usize,
    min_leaf: usize,
) -> usize {
    let mean = indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64;

    if depth == 0 || indices.len() < 2 * min_leaf {
        nodes.push(TreeNode::Leaf { value: mean });
        return nodes.len() - 1;
    }

    let split = best_split(rows, targets, &indices, min_leaf);
    let (feature, threshold) = match split {
        Some(found) => found,
        None => {
            nodes.push(TreeNode::Leaf { value: mean });
            return nodes.len() - 1;
        }
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i][feature] < threshold);

    let node_id = nodes.len();
    nodes.push(TreeNode::Leaf { value: mean });
    let left = build_node(nodes, rows, targets, left_idx, depth - 1, min_leaf);
    let right = build_node(nodes, rows, targets, right_idx, depth - 1, min_leaf);
    nodes[node_id] = TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    };
    node_id
}

/// Exhaustive SSE-minimizing split search over all features
fn best_split(
    rows: &[[f64; FEATURE_COUNT]],
    targets: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<(usize, f64)> {
    let total: f64 = indices.iter().map(|&i| targets[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| targets[i] * targets[i]).sum();
    let n = indices.len() as f64;
    let base_sse = total_sq - total * total / n;
    if base_sse <= 1e-12 {
        return None;
    }

    let mut best: Option<(usize, f64, f64)> = None;
    for feature in 0..FEATURE_COUNT {
        let mut ordered: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (rows[i][feature], targets[i]))
            .collect();
        ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for s in 1..ordered.len() {
            left_sum += ordered[s - 1].1;
            left_sq += ordered[s - 1].1 * ordered[s - 1].1;
            if s < min_leaf || ordered.len() - s < min_leaf {
                continue;
            }
            if ordered[s - 1].0 >= ordered[s].0 {
                continue;
            }
            let ln = s as f64;
            let rn = (ordered.len() - s) as f64;
            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let sse =
                (left_sq - left_sum * left_sum / ln) + (right_sq - right_sum * right_sum / rn);
            let better = match best {
                Some((_, _, best_sse)) => sse < best_sse,
                None => sse < base_sse,
            };
            if better {
                let threshold = (ordered[s - 1].0 + ordered[s].0) / 2.0;
                best = Some((feature, threshold, sse));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}
