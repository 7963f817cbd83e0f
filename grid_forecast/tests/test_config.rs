use grid_forecast::config::{GrowthMode, SeasonalityMode, SignalConfig, TrainerConfig};
use pretty_assertions::assert_eq;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    trainer: TrainerConfig,
    #[serde(default)]
    signals: Vec<SignalConfig>,
}

#[test]
fn test_partial_trainer_config_uses_defaults() {
    let doc: Document = toml::from_str(
        r#"
        [trainer]
        horizon_days = 30
        history_start = "2021-06-01"

        [trainer.seasonal_ar]
        max_p = 2
        "#,
    )
    .unwrap();

    assert_eq!(doc.trainer.horizon_days, 30);
    assert_eq!(doc.trainer.history_start.to_string(), "2021-06-01");
    assert_eq!(doc.trainer.seasonal_ar.max_p, 2);
    assert_eq!(doc.trainer.seasonal_ar.period, 7);
    assert_eq!(doc.trainer.validation_days, 30);
    assert_eq!(doc.trainer.model_version, "ENSEMBLE_v1");
    assert!(doc.trainer.validate().is_ok());
}

#[test]
fn test_signal_profiles_from_toml() {
    let doc: Document = toml::from_str(
        r#"
        [[signals]]
        id = "SPOT_PRICE"
        unit = "$/kWh"
        primary_only = true
        growth = "flat"
        seasonality_mode = "multiplicative"
        window_months = 8
        floor = 86.0

        [[signals]]
        id = "RESERVOIR_PCT"
        scale_factor = 100.0
        "#,
    )
    .unwrap();

    let spot = &doc.signals[0];
    assert_eq!(spot.growth, GrowthMode::Flat);
    assert_eq!(spot.seasonality_mode, SeasonalityMode::Multiplicative);
    assert_eq!(spot.window_months, Some(8));
    assert_eq!(spot.floor, Some(86.0));
    assert!(spot.non_negative);

    let reservoir = &doc.signals[1];
    assert_eq!(reservoir.scale_factor, 100.0);
    assert!(!reservoir.primary_only);
    assert_eq!(reservoir.growth, GrowthMode::Linear);
}

#[test]
fn test_builtin_spot_price_profile() {
    let spot = SignalConfig::builtin()
        .into_iter()
        .find(|p| p.id == "SPOT_PRICE")
        .unwrap();
    assert!(spot.primary_only);
    assert_eq!(spot.floor, Some(86.0));
    assert_eq!(spot.window_months, Some(8));
}
