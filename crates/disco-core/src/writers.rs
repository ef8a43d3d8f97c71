use crate::costs::{CategoryCost, CostItem, CostReport};
use crate::error::DiscoError;
use crate::hosting_capacity::{ClassResult, HcSummaryRow};
use crate::impact::{by_feeder, ImpactRow};
use crate::loaders::{metrics_table_file, SummaryTables, METADATA_TABLE_FILE};
use crate::model::{MetadataRow, MetricTable, KEY_COLUMNS, NODE_TYPE_COLUMN, TIME_POINT_COLUMN};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const HC_SUMMARY_FILE: &str = "hc_summary.csv";
pub const UPGRADE_COSTS_FILE: &str = "upgrade_costs.csv";
pub const UPGRADE_COST_SUMMARY_FILE: &str = "upgrade_cost_summary.csv";
pub const UPGRADE_COSTS_JSON_FILE: &str = "upgrade_costs.json";

/// Create the output directory, refusing to reuse an existing one unless
/// `force` is set.
pub fn prepare_output_dir(path: &Path, force: bool) -> Result<(), DiscoError> {
    if path.exists() {
        if !force {
            return Err(DiscoError::OutputExists(path.to_path_buf()));
        }
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
    }
    fs::create_dir_all(path)?;
    Ok(())
}

pub fn hosting_capacity_file(class: &str) -> String {
    format!("hosting_capacity_{class}.json")
}

/// File name of a feeder's impact table. Characters outside
/// `[A-Za-z0-9_-]` become `_` so a feeder label cannot leave the output
/// directory.
pub fn impact_summary_file(feeder: &str) -> String {
    let safe: String = feeder
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("impact_summary_{safe}.csv")
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write a metric table: key columns, then `time_point`/`node_type` when the
/// table carries them, then the metric columns.
pub fn write_metric_table<W: Write>(table: &MetricTable, writer: W) -> Result<(), DiscoError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = KEY_COLUMNS.to_vec();
    if table.has_time_point {
        header.push(TIME_POINT_COLUMN);
    }
    if table.has_node_type {
        header.push(NODE_TYPE_COLUMN);
    }
    header.extend(table.metrics.iter().map(String::as_str));
    csv_writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = row.key.to_record();
        if table.has_time_point {
            record.push(row.time_point.clone().unwrap_or_default());
        }
        if table.has_node_type {
            record.push(row.node_type.clone().unwrap_or_default());
        }
        record.extend(table.metrics.iter().map(|m| format_value(row.value(m))));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// A record type written as a CSV row. `COLUMNS` lists the serialized field
/// names in declaration order so empty tables still get a header.
pub trait CsvRow: Serialize {
    const COLUMNS: &'static [&'static str];
}

impl CsvRow for MetadataRow {
    const COLUMNS: &'static [&'static str] = &[
        "feeder",
        "substation",
        "placement",
        "sample",
        "penetration_level",
        "scenario",
        "pct_pv_to_load_ratio",
        "pv_capacity_kw",
        "load_capacity_kw",
    ];
}

impl CsvRow for HcSummaryRow {
    const COLUMNS: &'static [&'static str] = &[
        "feeder",
        "metric_class",
        "min_hc_pct",
        "max_hc_pct",
        "min_hc_kw",
        "max_hc_kw",
        "violation_starting_penetration",
        "candidate_cba_samples",
        "recommended_cba_sample",
    ];
}

impl CsvRow for CostItem {
    const COLUMNS: &'static [&'static str] = &[
        "job",
        "equipment_type",
        "name",
        "action",
        "count",
        "matched_rating",
        "unit_cost",
        "total_cost",
    ];
}

impl CsvRow for CategoryCost {
    const COLUMNS: &'static [&'static str] = &["job", "equipment_type", "count", "total_cost"];
}

/// Write the header, then one line per row.
pub fn write_rows<T: CsvRow, W: Write>(rows: &[T], writer: W) -> Result<(), DiscoError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(T::COLUMNS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_metadata<W: Write>(rows: &[MetadataRow], writer: W) -> Result<(), DiscoError> {
    write_rows(rows, writer)
}

pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), DiscoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write every metric table and the metadata table into `dir`.
pub fn write_summary_tables(tables: &SummaryTables, dir: &Path) -> Result<Vec<PathBuf>, DiscoError> {
    let mut written = Vec::new();
    for (class, table) in &tables.metrics {
        let path = dir.join(metrics_table_file(class));
        write_metric_table(table, BufWriter::new(File::create(&path)?))?;
        written.push(path);
    }
    let path = dir.join(METADATA_TABLE_FILE);
    write_metadata(&tables.metadata, BufWriter::new(File::create(&path)?))?;
    written.push(path);
    info!(files = written.len(), dir = %dir.display(), "wrote summary tables");
    Ok(written)
}

pub fn write_hc_summary(rows: &[HcSummaryRow], dir: &Path) -> Result<PathBuf, DiscoError> {
    let path = dir.join(HC_SUMMARY_FILE);
    write_rows(rows, BufWriter::new(File::create(&path)?))?;
    Ok(path)
}

/// One `hosting_capacity_<class>.json` per result.
pub fn write_class_results<'a>(
    results: impl IntoIterator<Item = &'a ClassResult>,
    dir: &Path,
) -> Result<Vec<PathBuf>, DiscoError> {
    let mut written = Vec::new();
    for result in results {
        let path = dir.join(hosting_capacity_file(&result.metric_class));
        write_json(result, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Write one impact table per feeder.
///
/// Columns: key columns, `<class>_pass` for every class seen, `overall_pass`
/// and `violations`. A class the deployment is missing from leaves its pass
/// cell empty.
pub fn write_impact_summaries(impact: &[ImpactRow], dir: &Path) -> Result<Vec<PathBuf>, DiscoError> {
    let classes: BTreeSet<&str> = impact
        .iter()
        .flat_map(|row| row.classes.keys().map(String::as_str))
        .collect();

    let mut written = Vec::new();
    let mut file_names = BTreeSet::new();
    for (feeder, rows) in by_feeder(impact) {
        let file_name = impact_summary_file(feeder);
        if !file_names.insert(file_name.clone()) {
            return Err(DiscoError::AnalysisRun(format!(
                "feeder '{feeder}' maps to {file_name}, which another feeder already uses"
            )));
        }
        let path = dir.join(file_name);
        let mut csv_writer = csv::Writer::from_writer(BufWriter::new(File::create(&path)?));

        let mut header: Vec<String> = KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
        header.extend(classes.iter().map(|c| format!("{c}_pass")));
        header.push("overall_pass".to_string());
        header.push("violations".to_string());
        csv_writer.write_record(&header)?;

        for row in rows {
            let mut record = row.key.to_record();
            record.extend(classes.iter().map(|class| {
                row.classes
                    .get(*class)
                    .map(|o| o.passes.to_string())
                    .unwrap_or_default()
            }));
            record.push(row.overall_pass.map(|p| p.to_string()).unwrap_or_default());
            record.push(row.violation_summary());
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        written.push(path);
    }
    Ok(written)
}

/// Write the item table, the per-category summary and the full JSON report.
pub fn write_cost_report(report: &CostReport, dir: &Path) -> Result<Vec<PathBuf>, DiscoError> {
    let items_path = dir.join(UPGRADE_COSTS_FILE);
    write_rows(&report.items, BufWriter::new(File::create(&items_path)?))?;

    let summary_path = dir.join(UPGRADE_COST_SUMMARY_FILE);
    write_rows(&report.categories, BufWriter::new(File::create(&summary_path)?))?;

    let json_path = dir.join(UPGRADE_COSTS_JSON_FILE);
    write_json(report, &json_path)?;

    Ok(vec![items_path, summary_path, json_path])
}
