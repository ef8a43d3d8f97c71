use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric limits used to decide whether a deployment passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    /// Map of metric class -> (metric name -> limit).
    pub thresholds: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ThresholdConfig {
    /// Limits configured for one metric class.
    pub fn limits(&self, class: &str) -> Option<&BTreeMap<String, f64>> {
        self.thresholds.get(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.thresholds.keys().map(String::as_str)
    }
}
