use crate::hosting_capacity::engine::{EvaluatedClass, EvaluatedRow};
use crate::model::DeploymentKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one deployment against one metric class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassOutcome {
    pub passes: bool,
    /// Violated clauses as `metric=value` (`metric=missing` for absent values).
    pub violations: Vec<String>,
}

/// Per-deployment impact across every evaluated class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRow {
    pub key: DeploymentKey,
    pub classes: BTreeMap<String, ClassOutcome>,
    /// None when the deployment is missing from at least one class.
    pub overall_pass: Option<bool>,
}

impl ImpactRow {
    /// All violations, prefixed by class, joined with `;`.
    pub fn violation_summary(&self) -> String {
        self.classes
            .iter()
            .flat_map(|(class, outcome)| {
                outcome
                    .violations
                    .iter()
                    .map(move |v| format!("{class}:{v}"))
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Build one impact row per deployment key seen in any class, sorted by key.
pub fn build_impact_rows(classes: &[EvaluatedClass]) -> Vec<ImpactRow> {
    let mut rows: BTreeMap<DeploymentKey, BTreeMap<String, ClassOutcome>> = BTreeMap::new();

    for evaluated in classes {
        for row in &evaluated.table.rows {
            let violations = evaluated
                .query
                .violations(row)
                .into_iter()
                .map(|clause| match row.value(&clause.metric) {
                    Some(value) => format!("{}={}", clause.metric, value),
                    None => format!("{}=missing", clause.metric),
                })
                .collect::<Vec<_>>();
            let outcome = ClassOutcome {
                passes: violations.is_empty(),
                violations,
            };
            rows.entry(row.key.clone())
                .or_default()
                .insert(evaluated.class.clone(), outcome);
        }
    }

    rows.into_iter()
        .map(|(key, outcomes)| {
            let overall_pass = if outcomes.len() == classes.len() {
                Some(outcomes.values().all(|o| o.passes))
            } else {
                None
            };
            ImpactRow {
                key,
                classes: outcomes,
                overall_pass,
            }
        })
        .collect()
}

/// Deployments present in every class, passing only when every class passes.
pub fn overall_rows(impact: &[ImpactRow]) -> Vec<EvaluatedRow> {
    impact
        .iter()
        .filter_map(|row| {
            row.overall_pass.map(|passes| EvaluatedRow {
                key: row.key.clone(),
                passes,
            })
        })
        .collect()
}

/// Split impact rows by feeder.
pub fn by_feeder(impact: &[ImpactRow]) -> BTreeMap<&str, Vec<&ImpactRow>> {
    let mut grouped: BTreeMap<&str, Vec<&ImpactRow>> = BTreeMap::new();
    for row in impact {
        grouped.entry(row.key.feeder.as_str()).or_default().push(row);
    }
    grouped
}
