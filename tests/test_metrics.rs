use assert_approx_eq::assert_approx_eq;
use demand_forecast::metrics::evaluate_forecast;
use demand_forecast::ForecastError;

#[test]
fn test_known_metric_values() {
    let actual = vec![10.0, 20.0];
    let predicted = vec![12.0, 18.0];

    let metrics = evaluate_forecast(&actual, &predicted).unwrap();

    assert_approx_eq!(metrics.mae, 2.0);
    assert_approx_eq!(metrics.rmse, 2.0);
    assert_approx_eq!(metrics.mape, 15.0);
    assert_approx_eq!(metrics.accuracy, 0.85);
}

#[test]
fn test_perfect_forecast() {
    let actual = vec![5.0, 0.0, 7.0];
    let predicted = vec![5.0, 0.0, 7.0];

    let metrics = evaluate_forecast(&actual, &predicted).unwrap();

    assert_approx_eq!(metrics.mae, 0.0);
    assert_approx_eq!(metrics.rmse, 0.0);
    assert_approx_eq!(metrics.mape, 0.0);
    assert_approx_eq!(metrics.accuracy, 1.0);
}

#[test]
fn test_zero_actual_does_not_divide_by_zero() {
    let actual = vec![0.0];
    let predicted = vec![5.0];

    let metrics = evaluate_forecast(&actual, &predicted).unwrap();

    assert!(metrics.mape.is_finite());
    assert!(metrics.mape >= 0.0);
    assert_approx_eq!(metrics.accuracy, 0.0);
}

#[test]
fn test_accuracy_stays_in_unit_interval() {
    let actual = vec![1.0, 2.0, 1.0];
    let predicted = vec![100.0, 200.0, 100.0];

    let metrics = evaluate_forecast(&actual, &predicted).unwrap();

    assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);
    assert!(metrics.mae >= 0.0);
    assert!(metrics.rmse >= 0.0);
    assert!(metrics.mape >= 0.0);
}

#[test]
fn test_empty_test_partition_is_unavailable() {
    let result = evaluate_forecast(&[], &[]);
    assert!(matches!(
        result,
        Err(ForecastError::EvaluationUnavailable(_))
    ));
}

#[test]
fn test_length_mismatch_is_invalid() {
    let result = evaluate_forecast(&[1.0, 2.0], &[1.0]);
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}
