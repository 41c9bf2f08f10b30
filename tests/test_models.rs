use assert_approx_eq::assert_approx_eq;
use chrono::{Duration, NaiveDate};
use demand_forecast::models::{
    ArimaModel, EnsembleModel, ForecastBands, ForecastModel, SeasonalNaiveModel,
    TrainedForecastModel,
};
use demand_forecast::{DailySeries, ForecastError, ModelKind};

fn start_date() -> NaiveDate {
    // A Monday
    "2024-01-01".parse().unwrap()
}

fn series_from_fn(days: usize, mut f: impl FnMut(usize) -> f64) -> DailySeries {
    (0..days)
        .map(|i| (start_date() + Duration::days(i as i64), f(i)))
        .collect()
}

#[test]
fn test_seasonal_recovers_weekly_pattern() {
    // Weekdays sell 10, weekends sell 30, for 8 full weeks
    let series = series_from_fn(56, |i| if i % 7 >= 5 { 30.0 } else { 10.0 });

    let trained = SeasonalNaiveModel::new().train(&series).unwrap();
    let forecast = trained.forecast(7).unwrap();

    let expected = [10.0, 10.0, 10.0, 10.0, 10.0, 30.0, 30.0];
    for (value, want) in forecast.values.iter().zip(expected.iter()) {
        assert_approx_eq!(value, want);
    }
}

#[test]
fn test_seasonal_bounds_bracket_points() {
    let series = series_from_fn(56, |i| 10.0 + (i % 7) as f64);

    let trained = SeasonalNaiveModel::new().train(&series).unwrap();
    let forecast = trained.forecast(14).unwrap();

    for i in 0..forecast.horizon() {
        assert!(forecast.lower[i] <= forecast.values[i]);
        assert!(forecast.values[i] <= forecast.upper[i]);
    }
}

#[test]
fn test_seasonal_falls_back_to_overall_mean() {
    // Three days only: most weekday groups are unseen
    let series = series_from_fn(3, |i| 10.0 + i as f64);
    let overall = series.mean();

    let trained = SeasonalNaiveModel::new().train(&series).unwrap();
    let forecast = trained.forecast(7).unwrap();

    // Thursday through Sunday have no matching weekday group
    for i in 0..4 {
        assert_approx_eq!(forecast.values[i], overall);
    }
    // The following Monday was observed
    assert_approx_eq!(forecast.values[4], 10.0);
}

#[test]
fn test_seasonal_rejects_empty_series() {
    let result = SeasonalNaiveModel::new().train(&DailySeries::new());
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[test]
fn test_arima_flat_series_forecasts_flat() {
    let series = series_from_fn(50, |_| 20.0);

    let trained = ArimaModel::new().train(&series).unwrap();
    let forecast = trained.forecast(5).unwrap();

    for value in &forecast.values {
        assert_approx_eq!(value, 20.0);
    }
    for i in 0..forecast.horizon() {
        assert!(forecast.lower[i] <= forecast.values[i]);
        assert!(forecast.values[i] <= forecast.upper[i]);
    }
}

#[test]
fn test_arima_extends_linear_trend() {
    let series = series_from_fn(60, |i| (i + 1) as f64);

    let trained = ArimaModel::new().train(&series).unwrap();
    let forecast = trained.forecast(3).unwrap();

    assert_approx_eq!(forecast.values[0], 61.0, 0.5);
    assert_approx_eq!(forecast.values[1], 62.0, 0.5);
    assert_approx_eq!(forecast.values[2], 63.0, 0.5);
}

#[test]
fn test_arima_intervals_widen_with_horizon() {
    let mut state = 37u64;
    let series = series_from_fn(120, |_| {
        // Small deterministic pseudo-noise around 20
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        20.0 + ((state >> 33) % 7) as f64 - 3.0
    });

    let trained = ArimaModel::new().train(&series).unwrap();
    let forecast = trained.forecast(10).unwrap();

    let first_width = forecast.upper[0] - forecast.lower[0];
    let last_width = forecast.upper[9] - forecast.lower[9];
    assert!(last_width >= first_width);
}

#[test]
fn test_arima_rejects_tiny_series() {
    let series = series_from_fn(4, |i| i as f64);
    let result = ArimaModel::new().train(&series);
    assert!(matches!(result, Err(ForecastError::ModelTraining(_))));
}

#[test]
fn test_ensemble_flat_series_forecasts_flat() {
    let series = series_from_fn(60, |_| 20.0);

    let trained = EnsembleModel::new(42).train(&series).unwrap();
    let forecast = trained.forecast(5).unwrap();

    for value in &forecast.values {
        assert_approx_eq!(value, 20.0);
    }
}

#[test]
fn test_ensemble_is_deterministic_under_seed() {
    let series = series_from_fn(90, |i| 15.0 + ((i * 13) % 11) as f64);

    let first = EnsembleModel::new(99).train(&series).unwrap().forecast(7).unwrap();
    let second = EnsembleModel::new(99).train(&series).unwrap().forecast(7).unwrap();

    assert_eq!(first.values, second.values);
    assert_eq!(first.lower, second.lower);
    assert_eq!(first.upper, second.upper);
}

#[test]
fn test_ensemble_needs_enough_feature_rows() {
    // 35 days leaves only 5 rows after the 30-day warmup
    let series = series_from_fn(35, |i| i as f64);
    let result = EnsembleModel::new(1).train(&series);
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}

#[test]
fn test_forecast_bands_validate_lengths() {
    let result = ForecastBands::new(vec![1.0, 2.0], vec![0.5], vec![1.5, 2.5]);
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_forecast_bands_sanitize_fixes_crossed_bounds() {
    let bands = ForecastBands::new(
        vec![10.0, -2.0],
        vec![12.0, -5.0],
        vec![8.0, -1.0],
    )
    .unwrap()
    .sanitize();

    for i in 0..2 {
        assert!(bands.values[i] >= 0.0);
        assert!(bands.lower[i] <= bands.values[i]);
        assert!(bands.values[i] <= bands.upper[i]);
    }
}

#[test]
fn test_model_kind_parses_case_insensitively() {
    assert_eq!("ARIMA".parse::<ModelKind>().unwrap(), ModelKind::Arima);
    assert_eq!("rf".parse::<ModelKind>().unwrap(), ModelKind::Ensemble);
    assert_eq!("Seasonal".parse::<ModelKind>().unwrap(), ModelKind::Seasonal);
    assert!(matches!(
        "prophet".parse::<ModelKind>(),
        Err(ForecastError::InvalidParameter(_))
    ));
}
