use crate::model::{DeploymentKey, MetricKind, MetricRow, MetricTable};
use std::collections::BTreeMap;
use tracing::debug;

/// Collapse a metric table to one row per deployment key.
///
/// Each metric keeps its worst value across time points and node types: the
/// minimum for min-type metrics, the maximum otherwise. A non-empty
/// `node_types` keeps only rows of those node types first. Tables without
/// time-point or node-type columns are returned unchanged.
pub fn synthesize(table: &MetricTable, node_types: &[String]) -> MetricTable {
    let filter_nodes = table.has_node_type && !node_types.is_empty();
    if table.is_synthesized() && !filter_nodes {
        return table.clone();
    }

    let mut worst: BTreeMap<DeploymentKey, BTreeMap<String, f64>> = BTreeMap::new();
    let mut input_rows = 0usize;

    for row in &table.rows {
        if filter_nodes {
            match &row.node_type {
                Some(node_type) if node_types.contains(node_type) => {}
                _ => continue,
            }
        }
        input_rows += 1;

        let values = worst.entry(row.key.clone()).or_default();
        for (metric, &value) in &row.values {
            let kind = MetricKind::from_metric_name(metric);
            values
                .entry(metric.clone())
                .and_modify(|current| *current = kind.worst(*current, value))
                .or_insert(value);
        }
    }

    let rows: Vec<MetricRow> = worst
        .into_iter()
        .map(|(key, values)| MetricRow {
            key,
            time_point: None,
            node_type: None,
            values,
        })
        .collect();

    debug!(
        class = %table.class,
        input_rows,
        output_rows = rows.len(),
        "synthesized metric table"
    );

    MetricTable {
        class: table.class.clone(),
        metrics: table.metrics.clone(),
        has_time_point: false,
        has_node_type: false,
        rows,
    }
}
