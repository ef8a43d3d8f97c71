use crate::model::{MetricKind, MetricRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = ">=")]
    AtLeast,
}

impl ComparisonOp {
    pub fn for_metric(metric: &str) -> ComparisonOp {
        match MetricKind::from_metric_name(metric) {
            MetricKind::Min => ComparisonOp::AtLeast,
            MetricKind::Max => ComparisonOp::AtMost,
        }
    }

    pub fn holds(self, value: f64, limit: f64) -> bool {
        match self {
            ComparisonOp::AtMost => value <= limit,
            ComparisonOp::AtLeast => value >= limit,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOp::AtMost => write!(f, "<="),
            ComparisonOp::AtLeast => write!(f, ">="),
        }
    }
}

/// One `metric <op> limit` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub metric: String,
    pub op: ComparisonOp,
    pub limit: f64,
}

impl Comparison {
    /// A row without the metric does not satisfy the clause.
    pub fn holds(&self, row: &MetricRow) -> bool {
        row.value(&self.metric)
            .is_some_and(|value| self.op.holds(value, self.limit))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.metric, self.op, self.limit)
    }
}

/// Conjunction of comparisons for one metric class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub clauses: Vec<Comparison>,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// True when every clause holds for the row.
    pub fn passes(&self, row: &MetricRow) -> bool {
        self.clauses.iter().all(|c| c.holds(row))
    }

    /// Clauses the row violates, in query order.
    pub fn violations<'a>(&'a self, row: &MetricRow) -> Vec<&'a Comparison> {
        self.clauses.iter().filter(|c| !c.holds(row)).collect()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(" & "))
    }
}

/// Build the query for a metric class.
///
/// Every candidate metric (a column of the table) with a configured limit
/// yields one clause; configured metrics that are not candidates are dropped.
pub fn build_query(candidates: &[String], limits: &BTreeMap<String, f64>) -> Query {
    let clauses = candidates
        .iter()
        .filter_map(|metric| {
            limits.get(metric).map(|&limit| Comparison {
                metric: metric.clone(),
                op: ComparisonOp::for_metric(metric),
                limit,
            })
        })
        .collect();

    for metric in limits.keys() {
        if !candidates.contains(metric) {
            debug!(metric = %metric, "threshold has no matching column, no clause built");
        }
    }

    Query { clauses }
}
