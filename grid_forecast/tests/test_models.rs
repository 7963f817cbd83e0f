use chrono::{Duration, NaiveDate};
use grid_forecast::config::{GrowthMode, SeasonalArConfig, SeasonalityMode, TrendSeasonalConfig};
use grid_forecast::data::TimeSeriesData;
use grid_forecast::metrics::mean_absolute_percentage_error;
use grid_forecast::models::seasonal_ar::SeasonalArModel;
use grid_forecast::models::trend_seasonal::TrendSeasonalModel;
use grid_forecast::models::{ForecastModel, TrainedForecastModel};
use grid_forecast::utils::SyntheticSeries;
use rstest::rstest;

fn synthetic(days: usize) -> TimeSeriesData {
    SyntheticSeries {
        days,
        ..SyntheticSeries::default()
    }
    .generate()
    .unwrap()
}

#[test]
fn test_trend_seasonal_tracks_synthetic_series() {
    let data = synthetic(760);
    let (train, test) = data.split_holdout(30).unwrap();

    let model = TrendSeasonalModel::new(TrendSeasonalConfig::default(), 0.95).unwrap();
    let trained = model.train(&train).unwrap();
    let forecast = trained.forecast(30).unwrap();

    assert_eq!(forecast.horizons(), 30);
    assert_eq!(trained.training_len(), 730);
    let mape = mean_absolute_percentage_error(forecast.values(), test.values()).unwrap();
    assert!(mape < 0.08, "holdout MAPE too high: {}", mape);

    for ((lower, upper), value) in forecast.intervals().unwrap().iter().zip(forecast.values()) {
        assert!(lower < value && value < upper);
    }
}

#[rstest]
#[case(GrowthMode::Linear, SeasonalityMode::Additive)]
#[case(GrowthMode::Flat, SeasonalityMode::Additive)]
#[case(GrowthMode::Flat, SeasonalityMode::Multiplicative)]
#[case(GrowthMode::Linear, SeasonalityMode::Multiplicative)]
fn test_trend_seasonal_modes_produce_finite_forecasts(
    #[case] growth: GrowthMode,
    #[case] seasonality: SeasonalityMode,
) {
    let data = synthetic(240);
    let model = TrendSeasonalModel::new(TrendSeasonalConfig::default(), 0.9)
        .unwrap()
        .with_growth(growth)
        .with_seasonality_mode(seasonality);

    let forecast = model.train(&data).unwrap().forecast(14).unwrap();
    assert!(forecast.values().iter().all(|v| v.is_finite() && *v > 0.0));
}

#[test]
fn test_multiplicative_requires_positive_values() {
    let start: NaiveDate = "2024-01-01".parse().unwrap();
    let dates = (0..60).map(|i| start + Duration::days(i)).collect();
    let mut values = vec![10.0; 60];
    values[10] = 0.0;
    let data = TimeSeriesData::new(dates, values).unwrap();

    let model = TrendSeasonalModel::new(TrendSeasonalConfig::default(), 0.95)
        .unwrap()
        .with_seasonality_mode(SeasonalityMode::Multiplicative);
    assert!(model.train(&data).is_err());
}

#[test]
fn test_invalid_model_parameters() {
    let config = TrendSeasonalConfig {
        changepoint_prior_scale: 0.0,
        ..TrendSeasonalConfig::default()
    };
    assert!(TrendSeasonalModel::new(config, 0.95).is_err());
    assert!(TrendSeasonalModel::new(TrendSeasonalConfig::default(), 1.2).is_err());

    let config = SeasonalArConfig {
        period: 1,
        ..SeasonalArConfig::default()
    };
    assert!(SeasonalArModel::new(config, 0.95).is_err());
}

#[test]
fn test_seasonal_ar_selects_weekly_model() {
    let data = SyntheticSeries {
        days: 400,
        noise_std: 1.0,
        ..SyntheticSeries::default()
    }
    .generate()
    .unwrap();
    let (train, test) = data.split_holdout(14).unwrap();

    let trained = SeasonalArModel::new(SeasonalArConfig::default(), 0.95)
        .unwrap()
        .train(&train)
        .unwrap();
    let order = trained.order();
    assert!(order.p + order.seasonal_p <= 5);
    assert!(order.d <= 2 && order.seasonal_d <= 1);

    let forecast = trained.forecast(14).unwrap();
    let mape = mean_absolute_percentage_error(forecast.values(), test.values()).unwrap();
    assert!(mape < 0.1, "holdout MAPE too high: {}", mape);
}
