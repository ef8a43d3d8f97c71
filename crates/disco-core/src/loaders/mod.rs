pub mod csv_table;
pub mod job_outputs;

use crate::error::DiscoError;
use crate::model::{MetadataRow, MetricTable};
use job_outputs::JobOutputs;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

pub const METADATA_TABLE_FILE: &str = "metadata_table.csv";
pub const METRICS_TABLE_SUFFIX: &str = "_metrics_table.csv";

/// Aggregated tables for a whole batch: one metric table per class plus the
/// deployment metadata.
#[derive(Debug, Clone, Default)]
pub struct SummaryTables {
    pub metrics: BTreeMap<String, MetricTable>,
    pub metadata: Vec<MetadataRow>,
}

impl SummaryTables {
    pub fn classes(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }
}

/// File name of the aggregated table for a metric class.
pub fn metrics_table_file(class: &str) -> String {
    format!("{class}{METRICS_TABLE_SUFFIX}")
}

/// Concatenate per-job outputs into batch-wide tables.
///
/// Metric columns are the union across jobs, in first-seen order.
pub fn merge_jobs(jobs: &[JobOutputs]) -> SummaryTables {
    let mut merged = SummaryTables::default();

    for job in jobs {
        merged.metadata.push(job.metadata.clone());
        for (class, table) in &job.tables {
            let target = merged
                .metrics
                .entry(class.clone())
                .or_insert_with(|| MetricTable::new(class.clone(), Vec::new()));
            for metric in &table.metrics {
                if !target.metrics.contains(metric) {
                    target.metrics.push(metric.clone());
                }
            }
            target.has_time_point |= table.has_time_point;
            target.has_node_type |= table.has_node_type;
            target.rows.extend(table.rows.iter().cloned());
        }
    }

    merged
}

/// Read `<class>_metrics_table.csv` files and `metadata_table.csv` from a
/// directory written by `make-summary-tables`.
pub fn load_tables_dir(dir: &Path) -> Result<SummaryTables, DiscoError> {
    let mut tables = SummaryTables::default();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(class) = file_name.strip_suffix(METRICS_TABLE_SUFFIX) {
            let table = csv_table::read_metric_table_file(&path, class, None)?;
            tables.metrics.insert(class.to_string(), table);
        }
    }

    let metadata_path = dir.join(METADATA_TABLE_FILE);
    if metadata_path.is_file() {
        tables.metadata = csv_table::read_metadata_file(&metadata_path)?;
    }

    if tables.metrics.is_empty() {
        return Err(DiscoError::NoMatches);
    }

    info!(
        classes = ?tables.classes(),
        metadata_rows = tables.metadata.len(),
        dir = %dir.display(),
        "loaded summary tables"
    );
    Ok(tables)
}
