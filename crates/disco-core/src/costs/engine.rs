use crate::costs::unit_costs::{f64_to_decimal, nearest, RatedCost, UnitCostDatabase};
use crate::costs::upgrades::{EquipmentType, UpgradeAction, UpgradeRecord};
use crate::error::DiscoError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FEET_PER_MILE: i64 = 5280;

/// Cost of one upgrade record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    pub job: String,
    pub equipment_type: EquipmentType,
    pub name: String,
    pub action: UpgradeAction,
    pub count: i64,
    /// Rating of the matched workbook entry, if the lookup is by size.
    pub matched_rating: Option<f64>,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

/// Totals for one equipment category of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCost {
    pub job: String,
    pub equipment_type: EquipmentType,
    pub count: i64,
    pub total_cost: Decimal,
}

/// Grand total for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCost {
    pub job: String,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub items: Vec<CostItem>,
    pub categories: Vec<CategoryCost>,
    pub totals: Vec<JobCost>,
}

/// Price a single upgrade record against the unit cost tables.
pub fn price_record(
    job: &str,
    record: &UpgradeRecord,
    db: &UnitCostDatabase,
) -> Result<CostItem, DiscoError> {
    let count = record.count();
    if count < 0 {
        return Err(DiscoError::AnalysisRun(format!(
            "{} in job '{}' has negative equipment count {}",
            record.name(),
            job,
            count
        )));
    }

    let (matched_rating, unit_cost, quantity) = match record {
        UpgradeRecord::Line {
            phases,
            ampacity,
            length_ft,
            ..
        } => {
            let ampacity = checked_field(job, record, "ampacity", *ampacity)?;
            let length_ft = checked_field(job, record, "length_ft", *length_ft)?;
            let entry = lookup(&db.lines, record, Some(*phases), ampacity)?;
            let miles = f64_to_decimal(length_ft)
                .and_then(|feet| feet.checked_div(Decimal::from(FEET_PER_MILE)))
                .ok_or_else(|| invalid_field(job, record, "length_ft", length_ft))?;
            let quantity = miles
                .checked_mul(Decimal::from(count))
                .ok_or_else(|| overflow(job, record))?;
            (Some(entry.rating), entry.cost, quantity)
        }
        UpgradeRecord::Transformer { phases, kva, .. } => {
            let kva = checked_field(job, record, "kva", *kva)?;
            let entry = lookup(&db.transformers, record, Some(*phases), kva)?;
            (Some(entry.rating), entry.cost, Decimal::from(count))
        }
        UpgradeRecord::Regulator { kva, .. } => {
            let kva = checked_field(job, record, "kva", *kva)?;
            let entry = lookup(&db.regulators, record, None, kva)?;
            (Some(entry.rating), entry.cost, Decimal::from(count))
        }
        UpgradeRecord::Capacitor { action, .. } => {
            let cost = db
                .capacitors
                .get(action)
                .copied()
                .ok_or_else(|| DiscoError::UnitCostMissing {
                    equipment: record.name().to_string(),
                    reason: format!("no capacitor cost for action '{action}'"),
                })?;
            (None, cost, Decimal::from(count))
        }
    };

    let total_cost = unit_cost
        .checked_mul(quantity)
        .ok_or_else(|| overflow(job, record))?
        .round_dp(2);

    Ok(CostItem {
        job: job.to_string(),
        equipment_type: record.equipment_type(),
        name: record.name().to_string(),
        action: record.action(),
        count,
        matched_rating,
        unit_cost,
        total_cost,
    })
}

fn invalid_field(job: &str, record: &UpgradeRecord, field: &str, value: f64) -> DiscoError {
    DiscoError::AnalysisRun(format!(
        "{} in job '{}' has invalid {} {}",
        record.name(),
        job,
        field,
        value
    ))
}

/// Ratings and lengths must be finite and non-negative.
fn checked_field(job: &str, record: &UpgradeRecord, field: &str, value: f64) -> Result<f64, DiscoError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(invalid_field(job, record, field, value))
    }
}

fn overflow(job: &str, record: &UpgradeRecord) -> DiscoError {
    DiscoError::AnalysisRun(format!(
        "cost of {} in job '{}' is out of range",
        record.name(),
        job
    ))
}

fn sum_overflow(job: &str) -> DiscoError {
    DiscoError::AnalysisRun(format!("cost totals of job '{job}' are out of range"))
}

fn lookup<'a>(
    entries: &'a [RatedCost],
    record: &UpgradeRecord,
    phases: Option<u8>,
    rating: f64,
) -> Result<&'a RatedCost, DiscoError> {
    nearest(entries, phases, rating).ok_or_else(|| DiscoError::UnitCostMissing {
        equipment: record.name().to_string(),
        reason: match phases {
            Some(p) => format!("no {} size with {} phase(s)", record.equipment_type(), p),
            None => format!("no {} sizes in the workbook", record.equipment_type()),
        },
    })
}

/// Price every job's upgrades and aggregate per category and per job.
///
/// Jobs are reported in the given order; categories within a job in
/// equipment-type order.
pub fn aggregate_costs(
    jobs: &[(String, Vec<UpgradeRecord>)],
    db: &UnitCostDatabase,
) -> Result<CostReport, DiscoError> {
    let mut report = CostReport::default();

    for (job, records) in jobs {
        let items = records
            .iter()
            .map(|record| price_record(job, record, db))
            .collect::<Result<Vec<_>, _>>()?;

        let mut categories: BTreeMap<EquipmentType, (i64, Decimal)> = BTreeMap::new();
        for item in &items {
            let entry = categories.entry(item.equipment_type).or_default();
            entry.0 = entry.0.checked_add(item.count).ok_or_else(|| sum_overflow(job))?;
            entry.1 = entry
                .1
                .checked_add(item.total_cost)
                .ok_or_else(|| sum_overflow(job))?;
        }

        let job_total = categories
            .values()
            .try_fold(Decimal::ZERO, |total, (_, cost)| total.checked_add(*cost))
            .ok_or_else(|| sum_overflow(job))?;
        report.categories.extend(categories.into_iter().map(
            |(equipment_type, (count, total_cost))| CategoryCost {
                job: job.clone(),
                equipment_type,
                count,
                total_cost,
            },
        ));
        report.totals.push(JobCost {
            job: job.clone(),
            total_cost: job_total,
        });
        report.items.extend(items);
    }

    Ok(report)
}
