use serde::{Deserialize, Serialize};

/// Name used for the result that joins every evaluated metric class.
pub const OVERALL_CLASS: &str = "overall";

/// Hosting capacity of one feeder for one metric class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostingCapacitySummary {
    pub feeder: String,
    pub metric_class: String,
    /// Highest passing penetration with no failing penetration at or below it.
    pub min_hc_pct: f64,
    /// Highest passing penetration.
    pub max_hc_pct: f64,
    /// `min_hc_pct` converted with the feeder's load capacity, if known.
    pub min_hc_kw: Option<f64>,
    pub max_hc_kw: Option<f64>,
    /// Lowest penetration with any failing deployment.
    pub violation_starting_penetration: Option<f64>,
    /// Samples failing at the violation-starting penetration.
    pub candidate_cba_samples: Vec<String>,
    /// Sample with the highest violation frequency.
    pub recommended_cba_sample: Option<String>,
    pub total_rows: usize,
    pub failing_rows: usize,
}

/// Hosting capacity of every feeder for one metric class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassResult {
    pub metric_class: String,
    /// Rendered query, e.g. `min_voltage >= 0.95 & max_voltage <= 1.05`.
    pub query: String,
    pub feeders: Vec<HostingCapacitySummary>,
}

/// Full hosting-capacity result for a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostingCapacityReport {
    pub thresholds_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    pub classes: Vec<ClassResult>,
    pub overall: ClassResult,
}

impl HostingCapacityReport {
    /// Per-class results followed by the overall result.
    pub fn all_results(&self) -> impl Iterator<Item = &ClassResult> {
        self.classes.iter().chain(std::iter::once(&self.overall))
    }

    /// Flatten into `hc_summary.csv` rows.
    pub fn summary_rows(&self) -> Vec<HcSummaryRow> {
        self.all_results()
            .flat_map(|result| result.feeders.iter().map(HcSummaryRow::from))
            .collect()
    }
}

/// One line of `hc_summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HcSummaryRow {
    pub feeder: String,
    pub metric_class: String,
    pub min_hc_pct: f64,
    pub max_hc_pct: f64,
    pub min_hc_kw: Option<f64>,
    pub max_hc_kw: Option<f64>,
    pub violation_starting_penetration: Option<f64>,
    /// Semicolon-separated sample names.
    pub candidate_cba_samples: String,
    pub recommended_cba_sample: Option<String>,
}

impl From<&HostingCapacitySummary> for HcSummaryRow {
    fn from(summary: &HostingCapacitySummary) -> Self {
        Self {
            feeder: summary.feeder.clone(),
            metric_class: summary.metric_class.clone(),
            min_hc_pct: summary.min_hc_pct,
            max_hc_pct: summary.max_hc_pct,
            min_hc_kw: summary.min_hc_kw,
            max_hc_kw: summary.max_hc_kw,
            violation_starting_penetration: summary.violation_starting_penetration,
            candidate_cba_samples: summary.candidate_cba_samples.join(";"),
            recommended_cba_sample: summary.recommended_cba_sample.clone(),
        }
    }
}
