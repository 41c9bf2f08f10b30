//! Chronological train/test partitioning

use crate::series::DailySeries;

/// A chronological partition of a loaded series
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    /// Earlier partition, used for fitting
    pub train: DailySeries,
    /// Later partition, used for evaluation; may be empty for short series
    pub test: DailySeries,
}

/// Split a series at a fractional index measured in data points.
///
/// The last `1 - train_fraction` of the points, in date order, becomes the
/// test partition. The train partition never shrinks below `min_train`
/// points; for short series the test partition shrinks instead, possibly to
/// empty. Data is never fabricated here.
pub fn chronological_split(
    series: &DailySeries,
    train_fraction: f64,
    min_train: usize,
) -> TrainTestSplit {
    let total = series.len();
    let mut train_size = (total as f64 * train_fraction).floor() as usize;
    if train_size < min_train {
        train_size = min_train;
    }
    if train_size > total {
        train_size = total;
    }

    let (train, test) = series.split_at(train_size);
    TrainTestSplit { train, test }
}
