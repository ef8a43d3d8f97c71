use crate::error::DiscoError;
use crate::hosting_capacity::outcome::HostingCapacitySummary;
use crate::model::{compare_samples, DeploymentKey, MetricTable};
use crate::synthesis::synthesize;
use crate::thresholds::query::{build_query, Query};
use std::collections::BTreeMap;

/// Pass/fail status of one deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedRow {
    pub key: DeploymentKey,
    pub passes: bool,
}

/// A synthesized metric table together with the query it is judged by.
#[derive(Debug, Clone)]
pub struct EvaluatedClass {
    pub class: String,
    pub query: Query,
    pub table: MetricTable,
}

impl EvaluatedClass {
    /// Synthesize `table` and build its query from the class limits.
    pub fn new(table: &MetricTable, limits: &BTreeMap<String, f64>, node_types: &[String]) -> Self {
        let table = synthesize(table, node_types);
        let query = build_query(&table.metrics, limits);
        Self {
            class: table.class.clone(),
            query,
            table,
        }
    }

    pub fn evaluated_rows(&self) -> Vec<EvaluatedRow> {
        self.table
            .rows
            .iter()
            .map(|row| EvaluatedRow {
                key: row.key.clone(),
                passes: self.query.passes(row),
            })
            .collect()
    }
}

/// Keep only rows of one scenario.
pub fn filter_scenario(table: &MetricTable, scenario: &str) -> MetricTable {
    let mut filtered = table.clone();
    filtered.rows.retain(|row| row.key.scenario == scenario);
    filtered
}

/// Summarize every feeder present in `rows`.
pub fn summarize_class(
    class: &str,
    rows: &[EvaluatedRow],
    load_capacity_kw: &BTreeMap<String, f64>,
) -> Result<Vec<HostingCapacitySummary>, DiscoError> {
    let mut by_feeder: BTreeMap<&str, Vec<EvaluatedRow>> = BTreeMap::new();
    for row in rows {
        by_feeder
            .entry(row.key.feeder.as_str())
            .or_default()
            .push(row.clone());
    }

    by_feeder
        .into_iter()
        .map(|(feeder, feeder_rows)| {
            summarize_feeder(
                feeder,
                class,
                &feeder_rows,
                load_capacity_kw.get(feeder).copied(),
            )
        })
        .collect()
}

/// Compute the hosting capacity of one feeder from its evaluated rows.
///
/// Pass/fail at each penetration is treated independently: the boundary is
/// found by comparing the passing and failing sets, never by assuming
/// violations only grow with penetration.
pub fn summarize_feeder(
    feeder: &str,
    class: &str,
    rows: &[EvaluatedRow],
    load_capacity_kw: Option<f64>,
) -> Result<HostingCapacitySummary, DiscoError> {
    if rows.is_empty() {
        return Err(DiscoError::NoMetricRows {
            feeder: feeder.to_string(),
        });
    }

    let (passing, failing): (Vec<&EvaluatedRow>, Vec<&EvaluatedRow>) =
        rows.iter().partition(|r| r.passes);

    let violation_starting_penetration = failing
        .iter()
        .map(|r| r.key.penetration_level)
        .min_by(f64::total_cmp);

    let max_hc_pct = passing
        .iter()
        .map(|r| r.key.penetration_level)
        .max_by(f64::total_cmp)
        .unwrap_or(0.0);

    let min_hc_pct = passing
        .iter()
        .map(|r| r.key.penetration_level)
        .filter(|&level| violation_starting_penetration.map_or(true, |start| level < start))
        .max_by(f64::total_cmp)
        .unwrap_or(0.0);

    let mut candidate_cba_samples: Vec<String> = match violation_starting_penetration {
        Some(start) => failing
            .iter()
            .filter(|r| r.key.penetration_level == start)
            .map(|r| r.key.sample.clone())
            .collect(),
        None => Vec::new(),
    };
    candidate_cba_samples.sort_by(|a, b| compare_samples(a, b));
    candidate_cba_samples.dedup();

    let to_kw = |pct: f64| load_capacity_kw.map(|kw| pct / 100.0 * kw);

    Ok(HostingCapacitySummary {
        feeder: feeder.to_string(),
        metric_class: class.to_string(),
        min_hc_pct,
        max_hc_pct,
        min_hc_kw: to_kw(min_hc_pct),
        max_hc_kw: to_kw(max_hc_pct),
        violation_starting_penetration,
        candidate_cba_samples,
        recommended_cba_sample: recommend_sample(rows),
        total_rows: rows.len(),
        failing_rows: failing.len(),
    })
}

/// Sample with the highest share of failing rows; the first sample in sorted
/// order wins ties. None when nothing fails.
fn recommend_sample(rows: &[EvaluatedRow]) -> Option<String> {
    // sample -> (failing, total)
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for row in rows {
        let entry = counts.entry(row.key.sample.as_str()).or_default();
        entry.1 += 1;
        if !row.passes {
            entry.0 += 1;
        }
    }

    let mut samples: Vec<(&str, f64)> = counts
        .into_iter()
        .filter(|(_, (failing, _))| *failing > 0)
        .map(|(sample, (failing, total))| (sample, failing as f64 / total as f64))
        .collect();
    samples.sort_by(|a, b| compare_samples(a.0, b.0));

    let mut best: Option<(&str, f64)> = None;
    for (sample, frequency) in samples {
        match best {
            Some((_, top)) if frequency <= top => {}
            _ => best = Some((sample, frequency)),
        }
    }
    best.map(|(sample, _)| sample.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetricRow;

    fn eval(sample: &str, pen: f64, passes: bool) -> EvaluatedRow {
        EvaluatedRow {
            key: DeploymentKey {
                feeder: "f1".into(),
                placement: "random".into(),
                sample: sample.into(),
                penetration_level: pen,
                ..Default::default()
            },
            passes,
        }
    }

    #[test]
    fn test_all_pass() {
        let rows = vec![eval("1", 5.0, true), eval("1", 10.0, true), eval("2", 15.0, true)];
        let s = summarize_feeder("f1", "thermal", &rows, Some(2000.0)).unwrap();
        assert_eq!(s.violation_starting_penetration, None);
        assert_eq!(s.max_hc_pct, 15.0);
        assert_eq!(s.min_hc_pct, 15.0);
        assert_eq!(s.max_hc_kw, Some(300.0));
        assert!(s.candidate_cba_samples.is_empty());
        assert_eq!(s.recommended_cba_sample, None);
        assert_eq!(s.failing_rows, 0);
    }

    #[test]
    fn test_boundary_between_pass_and_fail() {
        let rows = vec![
            eval("1", 5.0, true),
            eval("1", 10.0, true),
            eval("1", 15.0, false),
            eval("2", 5.0, true),
            eval("2", 10.0, false),
            eval("2", 15.0, false),
        ];
        let s = summarize_feeder("f1", "voltage", &rows, Some(1000.0)).unwrap();
        assert_eq!(s.violation_starting_penetration, Some(10.0));
        assert_eq!(s.min_hc_pct, 5.0);
        assert_eq!(s.max_hc_pct, 10.0);
        assert_eq!(s.min_hc_kw, Some(50.0));
        assert_eq!(s.max_hc_kw, Some(100.0));
        assert_eq!(s.candidate_cba_samples, vec!["2"]);
        // sample 2 fails 2 of 3, sample 1 fails 1 of 3
        assert_eq!(s.recommended_cba_sample.as_deref(), Some("2"));
    }

    #[test]
    fn test_non_monotonic_violations() {
        // passes again above the first violation
        let rows = vec![
            eval("1", 5.0, true),
            eval("1", 10.0, false),
            eval("1", 15.0, true),
            eval("1", 20.0, false),
        ];
        let s = summarize_feeder("f1", "thermal", &rows, None).unwrap();
        assert_eq!(s.violation_starting_penetration, Some(10.0));
        assert_eq!(s.min_hc_pct, 5.0);
        assert_eq!(s.max_hc_pct, 15.0);
        assert_eq!(s.min_hc_kw, None);
    }

    #[test]
    fn test_failing_at_lowest_level_gives_zero_min() {
        let rows = vec![eval("1", 5.0, false), eval("2", 5.0, true), eval("2", 10.0, true)];
        let s = summarize_feeder("f1", "thermal", &rows, None).unwrap();
        assert_eq!(s.min_hc_pct, 0.0);
        assert_eq!(s.max_hc_pct, 10.0);
    }

    #[test]
    fn test_nothing_passes() {
        let rows = vec![eval("1", 5.0, false), eval("1", 10.0, false)];
        let s = summarize_feeder("f1", "thermal", &rows, None).unwrap();
        assert_eq!(s.max_hc_pct, 0.0);
        assert_eq!(s.min_hc_pct, 0.0);
        assert_eq!(s.violation_starting_penetration, Some(5.0));
    }

    #[test]
    fn test_recommended_sample_tie_prefers_first() {
        let rows = vec![
            eval("10", 5.0, false),
            eval("10", 10.0, true),
            eval("9", 5.0, false),
            eval("9", 10.0, true),
        ];
        let s = summarize_feeder("f1", "thermal", &rows, None).unwrap();
        assert_eq!(s.recommended_cba_sample.as_deref(), Some("9"));
        assert_eq!(s.candidate_cba_samples, vec!["9", "10"]);
    }

    #[test]
    fn test_empty_feeder_is_error() {
        let err = summarize_feeder("f1", "thermal", &[], None).unwrap_err();
        assert!(matches!(err, DiscoError::NoMetricRows { .. }));
    }

    #[test]
    fn test_summarize_class_groups_feeders() {
        let mut rows = vec![eval("1", 5.0, true)];
        let mut other = eval("1", 5.0, false);
        other.key.feeder = "f2".into();
        rows.push(other);
        let caps = BTreeMap::from([("f2".to_string(), 500.0)]);
        let summaries = summarize_class("thermal", &rows, &caps).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].feeder, "f1");
        assert_eq!(summaries[1].violation_starting_penetration, Some(5.0));
        assert_eq!(summaries[1].max_hc_kw, Some(0.0));
    }

    #[test]
    fn test_evaluated_class_applies_query() {
        let mut table = MetricTable::new("thermal", vec!["line_max_instantaneous_loading_pct".into()]);
        for (pen, loading) in [(5.0, 80.0), (10.0, 120.0)] {
            table.rows.push(MetricRow {
                key: eval("1", pen, true).key,
                time_point: None,
                node_type: None,
                values: BTreeMap::from([("line_max_instantaneous_loading_pct".to_string(), loading)]),
            });
        }
        let limits = BTreeMap::from([("line_max_instantaneous_loading_pct".to_string(), 100.0)]);
        let evaluated = EvaluatedClass::new(&table, &limits, &[]);
        let rows = evaluated.evaluated_rows();
        assert!(rows[0].passes);
        assert!(!rows[1].passes);
    }

    #[test]
    fn test_filter_scenario() {
        let mut table = MetricTable::new("thermal", vec![]);
        for scenario in ["pf1", "control_mode"] {
            let mut key = eval("1", 5.0, true).key;
            key.scenario = scenario.into();
            table.rows.push(MetricRow {
                key,
                time_point: None,
                node_type: None,
                values: BTreeMap::new(),
            });
        }
        let filtered = filter_scenario(&table, "pf1");
        assert_eq!(filtered.rows.len(), 1);
        assert_eq!(filtered.rows[0].key.scenario, "pf1");
    }
}
