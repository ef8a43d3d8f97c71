use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Columns that identify a deployment in every metric and metadata table.
pub const KEY_COLUMNS: &[&str] = &[
    "feeder",
    "substation",
    "placement",
    "sample",
    "penetration_level",
    "scenario",
];

pub const TIME_POINT_COLUMN: &str = "time_point";
pub const NODE_TYPE_COLUMN: &str = "node_type";

/// Whether a metric describes a lower bound (`min_voltage`) or an upper bound
/// (loading percentages, violation counts, `max_voltage`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Min,
    Max,
}

impl MetricKind {
    /// Metrics are min-type when their name contains "min".
    pub fn from_metric_name(name: &str) -> MetricKind {
        if name.contains("min") {
            MetricKind::Min
        } else {
            MetricKind::Max
        }
    }

    /// Pick the worse of two values for this kind of metric.
    pub fn worst(self, a: f64, b: f64) -> f64 {
        match self {
            MetricKind::Min => a.min(b),
            MetricKind::Max => a.max(b),
        }
    }
}

/// Identifies one simulated PV deployment on a feeder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentKey {
    pub feeder: String,
    #[serde(default)]
    pub substation: String,
    #[serde(default, deserialize_with = "deserialize_label")]
    pub placement: String,
    #[serde(default, deserialize_with = "deserialize_label")]
    pub sample: String,
    pub penetration_level: f64,
    #[serde(default, deserialize_with = "deserialize_label")]
    pub scenario: String,
}

impl DeploymentKey {
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.feeder.clone(),
            self.substation.clone(),
            self.placement.clone(),
            self.sample.clone(),
            self.penetration_level.to_string(),
            self.scenario.clone(),
        ]
    }
}

impl Ord for DeploymentKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.feeder
            .cmp(&other.feeder)
            .then_with(|| self.substation.cmp(&other.substation))
            .then_with(|| self.placement.cmp(&other.placement))
            .then_with(|| compare_samples(&self.sample, &other.sample))
            .then_with(|| self.penetration_level.total_cmp(&other.penetration_level))
            .then_with(|| self.scenario.cmp(&other.scenario))
    }
}

impl PartialOrd for DeploymentKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DeploymentKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DeploymentKey {}

impl fmt::Display for DeploymentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}%",
            self.feeder, self.placement, self.sample, self.penetration_level
        )?;
        if !self.scenario.is_empty() {
            write!(f, " ({})", self.scenario)?;
        }
        Ok(())
    }
}

/// Samples are usually integers written as text; order them numerically when
/// both sides parse, lexically otherwise.
pub fn compare_samples(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// One row of a metric table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub key: DeploymentKey,
    pub time_point: Option<String>,
    pub node_type: Option<String>,
    pub values: BTreeMap<String, f64>,
}

impl MetricRow {
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }
}

/// A metric table for one metric class (`thermal`, `voltage`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    pub class: String,
    /// Metric column names in file order.
    pub metrics: Vec<String>,
    pub has_time_point: bool,
    pub has_node_type: bool,
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn new(class: impl Into<String>, metrics: Vec<String>) -> Self {
        Self {
            class: class.into(),
            metrics,
            has_time_point: false,
            has_node_type: false,
            rows: Vec::new(),
        }
    }

    /// True when there is at most one row per deployment key already.
    pub fn is_synthesized(&self) -> bool {
        !self.has_time_point && !self.has_node_type
    }

    pub fn feeders(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.key.feeder.as_str()).collect()
    }
}

/// Capacity figures for one deployment, used to turn percentages into kW.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub feeder: String,
    #[serde(default)]
    pub substation: String,
    #[serde(default, deserialize_with = "deserialize_label")]
    pub placement: String,
    #[serde(default, deserialize_with = "deserialize_label")]
    pub sample: String,
    pub penetration_level: f64,
    #[serde(default, deserialize_with = "deserialize_label")]
    pub scenario: String,
    #[serde(default)]
    pub pct_pv_to_load_ratio: Option<f64>,
    #[serde(default)]
    pub pv_capacity_kw: f64,
    pub load_capacity_kw: f64,
}

impl MetadataRow {
    pub fn key(&self) -> DeploymentKey {
        DeploymentKey {
            feeder: self.feeder.clone(),
            substation: self.substation.clone(),
            placement: self.placement.clone(),
            sample: self.sample.clone(),
            penetration_level: self.penetration_level,
            scenario: self.scenario.clone(),
        }
    }
}

/// Feeder name -> load capacity in kW (largest value seen for the feeder).
pub fn load_capacity_by_feeder(metadata: &[MetadataRow]) -> BTreeMap<String, f64> {
    let mut capacities: BTreeMap<String, f64> = BTreeMap::new();
    for row in metadata {
        capacities
            .entry(row.feeder.clone())
            .and_modify(|kw| *kw = kw.max(row.load_capacity_kw))
            .or_insert(row.load_capacity_kw);
    }
    capacities
}

/// Accepts labels written as strings or bare numbers (`"sample": 3`).
fn deserialize_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct LabelVisitor;

    impl<'de> Visitor<'de> for LabelVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or number label")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.trim().to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v.trim().to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(LabelVisitor)
}
