use grid_anomaly::ConfidenceTier;
use gridcast::{ConfigError, GridcastConfig};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn test_sample_configuration_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("gridcast.toml");
    let config = GridcastConfig::load_from(path).unwrap();

    assert_eq!(config.signals.len(), 3);
    assert_eq!(config.signal("SPOT_PRICE").unwrap().floor, Some(86.0));
    assert_eq!(config.anomaly.indicators.len(), 3);
    assert_eq!(
        config.anomaly.threshold_table().for_indicator("SPOT_PRICE").critical,
        40.0
    );
    assert_eq!(config.trainer.default_weights.primary, 0.6);
    assert!(config.policy_file.is_none());
}

#[test]
fn test_policy_file_relative_to_config() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("policies.toml"),
        "[[policy]]\nsource = \"SPOT_PRICE\"\ntier = \"RELIABLE\"\nmape_ceiling = 0.2\n",
    )
    .unwrap();
    let config_path = dir.path().join("gridcast.toml");
    fs::write(&config_path, "policy_file = \"policies.toml\"\n").unwrap();

    let config = GridcastConfig::load_from(&config_path).unwrap();
    assert_eq!(config.policy_file.as_deref(), Some(dir.path().join("policies.toml").as_path()));

    let registry = config.policy_registry().unwrap();
    assert_eq!(registry.get_policy("SPOT_PRICE").tier, ConfidenceTier::Reliable);
    assert_eq!(registry.get_policy("DEMAND").tier, ConfidenceTier::Unknown);
}

#[test]
fn test_duplicate_signals_rejected() {
    let text = "[[signals]]\nid = \"DEMAND\"\n\n[[signals]]\nid = \"DEMAND\"\n";
    assert!(matches!(
        GridcastConfig::from_toml_str(text),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = GridcastConfig::load_from(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_indicator_scale_must_match_trained_signal() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("gridcast.toml");
    let config = GridcastConfig::load_from(path).unwrap();
    let reservoir = config
        .anomaly
        .indicators
        .iter()
        .find(|i| i.id == "RESERVOIR_PCT")
        .unwrap();
    assert_eq!(reservoir.scale_factor, 100.0);

    let text = "[[signals]]\nid = \"RESERVOIR_PCT\"\nunit = \"%\"\nscale_factor = 100.0\n\n\
                [[anomaly.indicators]]\nid = \"RESERVOIR_PCT\"\ndisplay_name = \"Reservoir level\"\n";
    let err = GridcastConfig::from_toml_str(text).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("scale_factor")));
}
