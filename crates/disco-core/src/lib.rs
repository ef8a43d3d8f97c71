pub mod archive;
pub mod costs;
pub mod error;
pub mod hosting_capacity;
pub mod impact;
pub mod loaders;
pub mod model;
pub mod synthesis;
pub mod thresholds;
pub mod writers;

use costs::{aggregate_costs, load_all_upgrades, load_unit_costs, CostReport};
use error::DiscoError;
use hosting_capacity::engine::{filter_scenario, summarize_class};
use hosting_capacity::outcome::OVERALL_CLASS;
use hosting_capacity::{ClassResult, EvaluatedClass, HostingCapacityReport};
use impact::{build_impact_rows, overall_rows, ImpactRow};
use loaders::job_outputs::load_all_jobs;
use loaders::{merge_jobs, SummaryTables};
use model::load_capacity_by_feeder;
use std::path::Path;
use thresholds::schema::ThresholdConfig;
use tracing::{info, warn};

/// Row filters for a hosting-capacity run.
#[derive(Debug, Clone, Default)]
pub struct HostingCapacityOptions {
    /// Keep only rows of this scenario.
    pub scenario: Option<String>,
    /// Keep only these node types before synthesis (empty keeps all).
    pub node_types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HostingCapacityAnalysis {
    pub report: HostingCapacityReport,
    pub impact: Vec<ImpactRow>,
}

/// Read every job under `output_dir` and merge them into batch tables.
pub fn make_summary_tables(output_dir: &Path, threads: usize) -> Result<SummaryTables, DiscoError> {
    let jobs = load_all_jobs(output_dir, threads)?;
    let tables = merge_jobs(&jobs);
    info!(
        jobs = jobs.len(),
        classes = tables.metrics.len(),
        "merged summary tables"
    );
    Ok(tables)
}

/// Main API entry point: hosting capacity per metric class and overall.
///
/// Only classes present in both the thresholds and the tables are
/// evaluated. The overall class covers deployments present in every
/// evaluated class.
pub fn compute_hosting_capacity(
    tables: &SummaryTables,
    thresholds: &ThresholdConfig,
    options: &HostingCapacityOptions,
) -> Result<HostingCapacityAnalysis, DiscoError> {
    if tables.metadata.is_empty() {
        warn!("no metadata table; hosting capacity will be reported in percent only");
    }
    let load_capacity = load_capacity_by_feeder(&tables.metadata);

    let mut evaluated = Vec::new();
    for (class, limits) in &thresholds.thresholds {
        let Some(table) = tables.metrics.get(class) else {
            warn!(class = %class, "no metric table for threshold class");
            continue;
        };
        let table = match &options.scenario {
            Some(scenario) => filter_scenario(table, scenario),
            None => table.clone(),
        };
        let class_eval = EvaluatedClass::new(&table, limits, &options.node_types);
        if class_eval.table.rows.is_empty() {
            warn!(class = %class, "no rows left after filtering");
            continue;
        }
        evaluated.push(class_eval);
    }
    if evaluated.is_empty() {
        return Err(DiscoError::NoMatches);
    }

    let mut classes = Vec::new();
    for class_eval in &evaluated {
        let feeders = summarize_class(
            &class_eval.class,
            &class_eval.evaluated_rows(),
            &load_capacity,
        )?;
        info!(
            class = %class_eval.class,
            feeders = feeders.len(),
            query = %class_eval.query,
            "evaluated metric class"
        );
        classes.push(ClassResult {
            metric_class: class_eval.class.clone(),
            query: class_eval.query.to_string(),
            feeders,
        });
    }

    let impact = build_impact_rows(&evaluated);
    let joined = overall_rows(&impact);
    let dropped = impact.len() - joined.len();
    if dropped > 0 {
        warn!(dropped, "deployments missing from some metric class left out of overall");
    }
    let overall = ClassResult {
        metric_class: OVERALL_CLASS.to_string(),
        query: classes
            .iter()
            .map(|c| c.query.as_str())
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>()
            .join(" & "),
        feeders: summarize_class(OVERALL_CLASS, &joined, &load_capacity)?,
    };

    Ok(HostingCapacityAnalysis {
        report: HostingCapacityReport {
            thresholds_name: thresholds.name.clone(),
            scenario: options.scenario.clone(),
            classes,
            overall,
        },
        impact,
    })
}

/// Price the upgrades of every job under `output_dir`.
pub fn compute_upgrade_costs(
    output_dir: &Path,
    unit_costs_path: &Path,
    threads: usize,
) -> Result<CostReport, DiscoError> {
    let db = load_unit_costs(unit_costs_path)?;
    let jobs = load_all_upgrades(output_dir, threads)?;
    let report = aggregate_costs(&jobs, &db)?;
    info!(
        jobs = report.totals.len(),
        items = report.items.len(),
        "computed upgrade costs"
    );
    Ok(report)
}
