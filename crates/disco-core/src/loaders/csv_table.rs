use crate::error::DiscoError;
use crate::model::{
    DeploymentKey, MetadataRow, MetricRow, MetricTable, KEY_COLUMNS, NODE_TYPE_COLUMN,
    TIME_POINT_COLUMN,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read a metric table from CSV.
///
/// Key columns identify the deployment; `time_point` and `node_type` are
/// optional dimension columns; every other column is a numeric metric. When
/// `default_key` is given (per-job files), missing key columns are taken from
/// it instead of being required.
pub fn read_metric_table<R: Read>(
    class: &str,
    reader: R,
    source_name: &str,
    default_key: Option<&DeploymentKey>,
) -> Result<MetricTable, DiscoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    if default_key.is_none() {
        for required in ["feeder", "penetration_level"] {
            if position(required).is_none() {
                return Err(DiscoError::MissingColumn {
                    table: source_name.to_string(),
                    column: required.to_string(),
                });
            }
        }
    }

    let key_columns: Vec<(&str, usize)> = KEY_COLUMNS
        .iter()
        .filter_map(|c| position(c).map(|idx| (*c, idx)))
        .collect();
    let time_idx = position(TIME_POINT_COLUMN);
    let node_idx = position(NODE_TYPE_COLUMN);

    let metric_columns: Vec<(String, usize)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            !KEY_COLUMNS.contains(h) && *h != TIME_POINT_COLUMN && *h != NODE_TYPE_COLUMN
        })
        .map(|(idx, h)| (h.to_string(), idx))
        .collect();

    let mut table = MetricTable::new(
        class,
        metric_columns.iter().map(|(name, _)| name.clone()).collect(),
    );
    table.has_time_point = time_idx.is_some();
    table.has_node_type = node_idx.is_some();

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        // header is line 1
        let line_no = line + 2;

        let mut key = default_key.cloned().unwrap_or_default();
        for (column, idx) in &key_columns {
            let cell = record.get(*idx).unwrap_or("");
            apply_key_cell(&mut key, column, cell).map_err(|reason| {
                DiscoError::parse(source_name, format!("line {line_no}: {reason}"))
            })?;
        }

        let mut values = BTreeMap::new();
        for (name, idx) in &metric_columns {
            let cell = record.get(*idx).unwrap_or("");
            if cell.is_empty() {
                continue;
            }
            let value: f64 = cell.parse().map_err(|_| {
                DiscoError::parse(
                    source_name,
                    format!("line {line_no}: column '{name}' value '{cell}' is not numeric"),
                )
            })?;
            values.insert(name.clone(), value);
        }

        table.rows.push(MetricRow {
            key,
            time_point: time_idx.and_then(|i| non_empty(record.get(i))),
            node_type: node_idx.and_then(|i| non_empty(record.get(i))),
            values,
        });
    }

    Ok(table)
}

/// Read a metric table from a CSV file on disk.
pub fn read_metric_table_file(
    path: &Path,
    class: &str,
    default_key: Option<&DeploymentKey>,
) -> Result<MetricTable, DiscoError> {
    let file = File::open(path)?;
    read_metric_table(class, file, &path.display().to_string(), default_key)
}

/// Read `metadata_table.csv`.
pub fn read_metadata<R: Read>(reader: R, source_name: &str) -> Result<Vec<MetadataRow>, DiscoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let row: MetadataRow = result.map_err(|e| {
            DiscoError::parse(source_name, format!("line {}: {}", line + 2, e))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_metadata_file(path: &Path) -> Result<Vec<MetadataRow>, DiscoError> {
    let file = File::open(path)?;
    read_metadata(file, &path.display().to_string())
}

fn apply_key_cell(key: &mut DeploymentKey, column: &str, cell: &str) -> Result<(), String> {
    match column {
        "feeder" => key.feeder = cell.to_string(),
        "substation" => key.substation = cell.to_string(),
        "placement" => key.placement = cell.to_string(),
        "sample" => key.sample = cell.to_string(),
        "scenario" => key.scenario = cell.to_string(),
        "penetration_level" => {
            key.penetration_level = cell
                .parse()
                .map_err(|_| format!("penetration_level '{cell}' is not numeric"))?;
        }
        _ => {}
    }
    Ok(())
}

fn non_empty(cell: Option<&str>) -> Option<String> {
    cell.filter(|c| !c.is_empty()).map(str::to_string)
}
