use crate::error::DiscoError;
use crate::thresholds::parse_thresholds_str;
use crate::thresholds::schema::ThresholdConfig;

const SNAPSHOT_TOML: &str = include_str!("../../../../thresholds/snapshot.toml");
const TIME_SERIES_TOML: &str = include_str!("../../../../thresholds/time-series.toml");

/// Available predefined threshold sets.
pub const PRESETS: &[&str] = &["snapshot", "time-series"];

/// Load a predefined threshold set by name.
pub fn load_preset(name: &str) -> Result<ThresholdConfig, DiscoError> {
    match name {
        "snapshot" => parse_thresholds_str(SNAPSHOT_TOML),
        "time-series" => parse_thresholds_str(TIME_SERIES_TOML),
        _ => Err(DiscoError::ThresholdInvalid(format!(
            "unknown preset '{}'. Available: {}",
            name,
            PRESETS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_snapshot_preset() {
        let config = load_preset("snapshot").unwrap();
        assert_eq!(config.classes().collect::<Vec<_>>(), vec!["thermal", "voltage"]);
        assert_eq!(config.limits("voltage").unwrap()["min_voltage"], 0.95);
    }

    #[test]
    fn test_load_time_series_preset() {
        let config = load_preset("time-series").unwrap();
        let thermal = config.limits("thermal").unwrap();
        assert_eq!(thermal["line_max_moving_average_loading_pct"], 100.0);
    }

    #[test]
    fn test_all_presets_load() {
        for name in PRESETS {
            assert!(load_preset(name).is_ok(), "preset {name} failed to load");
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(load_preset("qsts").is_err());
    }
}
