pub mod builtin;
pub mod query;
pub mod schema;

use crate::error::DiscoError;
use schema::ThresholdConfig;
use std::path::Path;

/// Load a threshold configuration from a TOML file.
pub fn load_thresholds(path: &Path) -> Result<ThresholdConfig, DiscoError> {
    let content = std::fs::read_to_string(path).map_err(|e| DiscoError::ThresholdLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_thresholds(&content, path)
}

/// Parse a threshold configuration from a TOML string.
pub fn parse_thresholds(content: &str, source: &Path) -> Result<ThresholdConfig, DiscoError> {
    let config: ThresholdConfig =
        toml::from_str(content).map_err(|e| DiscoError::ThresholdLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_thresholds(&config)?;
    Ok(config)
}

/// Parse a threshold configuration from a TOML string (no file path context).
pub fn parse_thresholds_str(content: &str) -> Result<ThresholdConfig, DiscoError> {
    let config: ThresholdConfig = toml::from_str(content)?;
    validate_thresholds(&config)?;
    Ok(config)
}

/// Validate that a threshold configuration is well-formed.
pub fn validate_thresholds(config: &ThresholdConfig) -> Result<(), DiscoError> {
    if config.thresholds.is_empty() {
        return Err(DiscoError::ThresholdInvalid(
            "at least one metric class must be configured".into(),
        ));
    }

    for (class, limits) in &config.thresholds {
        if !is_identifier(class) {
            return Err(DiscoError::ThresholdInvalid(format!(
                "metric class '{}' must be a lowercase identifier",
                class
            )));
        }

        if limits.is_empty() {
            return Err(DiscoError::ThresholdInvalid(format!(
                "metric class '{}' has no thresholds",
                class
            )));
        }

        for (metric, limit) in limits {
            if !is_identifier(metric) {
                return Err(DiscoError::ThresholdInvalid(format!(
                    "metric '{}' in class '{}' must be a lowercase identifier",
                    metric, class
                )));
            }
            if !limit.is_finite() {
                return Err(DiscoError::ThresholdInvalid(format!(
                    "metric '{}' in class '{}' has a non-finite limit",
                    metric, class
                )));
            }
        }
    }

    Ok(())
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
