use approx::assert_relative_eq;
use grid_forecast::metrics::{
    evaluate_holdout, mean_absolute_error, mean_absolute_percentage_error,
    root_mean_squared_error,
};

#[test]
fn test_regression_metrics() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

    assert_relative_eq!(mean_absolute_error(&predicted, &actual).unwrap(), 2.4, epsilon = 1e-12);
    assert_relative_eq!(
        root_mean_squared_error(&predicted, &actual).unwrap(),
        (30.0_f64 / 5.0).sqrt(),
        epsilon = 1e-12
    );

    // (0.2 + 0.1 + 0.1 + 0.075 + 0.04) / 5
    let mape = mean_absolute_percentage_error(&predicted, &actual).unwrap();
    assert_relative_eq!(mape, 0.103, epsilon = 1e-12);
}

#[test]
fn test_mape_is_a_fraction_and_survives_zero_actuals() {
    let mape = mean_absolute_percentage_error(&[0.0, 110.0], &[0.0, 100.0]).unwrap();
    assert_relative_eq!(mape, 0.05, epsilon = 1e-12);

    // Zero actual with a miss is huge but finite
    let mape = mean_absolute_percentage_error(&[1.0], &[0.0]).unwrap();
    assert!(mape.is_finite() && mape > 1e6);
}

#[test]
fn test_error_handling() {
    let empty: Vec<f64> = vec![];
    assert!(mean_absolute_error(&empty, &empty).is_err());
    assert!(root_mean_squared_error(&[1.0, 2.0], &[1.0]).is_err());
}

#[test]
fn test_evaluate_holdout() {
    let accuracy = evaluate_holdout(&[95.0, 105.0], &[100.0, 100.0]).unwrap();
    assert_relative_eq!(accuracy.mape, 0.05, epsilon = 1e-12);
    assert_relative_eq!(accuracy.rmse, 5.0, epsilon = 1e-12);
    assert_relative_eq!(accuracy.mae, 5.0, epsilon = 1e-12);
    assert!(accuracy.to_string().contains("MAPE: 5.00%"));
}
