use crate::costs::upgrades::UpgradeAction;
use crate::error::DiscoError;
use calamine::{Data, Reader, Xlsx};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

pub const LINES_SHEET: &str = "lines";
pub const TRANSFORMERS_SHEET: &str = "transformers";
pub const REGULATORS_SHEET: &str = "regulators";
pub const CAPACITORS_SHEET: &str = "capacitors";

/// Cost of one rated size.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedCost {
    /// Phase count this size applies to; None matches any.
    pub phases: Option<u8>,
    /// Ampacity for lines, kVA for transformers and regulators.
    pub rating: f64,
    /// Cost per mile for lines, per unit otherwise.
    pub cost: Decimal,
}

/// Unit cost tables read from the cost workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitCostDatabase {
    pub lines: Vec<RatedCost>,
    pub transformers: Vec<RatedCost>,
    pub regulators: Vec<RatedCost>,
    pub capacitors: BTreeMap<UpgradeAction, Decimal>,
}

/// Nearest rated size by linear scan.
///
/// Entries whose phase count differs from `phases` are skipped. Equal
/// distances resolve to the larger rating.
pub fn nearest(entries: &[RatedCost], phases: Option<u8>, rating: f64) -> Option<&RatedCost> {
    let mut best: Option<&RatedCost> = None;
    for entry in entries {
        if let (Some(wanted), Some(have)) = (phases, entry.phases) {
            if wanted != have {
                continue;
            }
        }
        let distance = (entry.rating - rating).abs();
        best = match best {
            None => Some(entry),
            Some(current) => {
                let current_distance = (current.rating - rating).abs();
                if distance < current_distance
                    || (distance == current_distance && entry.rating > current.rating)
                {
                    Some(entry)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

/// Load the unit cost workbook.
///
/// Expected sheets (first row is a header, column order is free):
/// - `lines`: phases, ampacity, cost_per_mile
/// - `transformers`: phases, kva, cost_per_unit
/// - `regulators`: kva, cost_per_unit
/// - `capacitors`: action, cost_per_unit
pub fn load_unit_costs(path: &Path) -> Result<UnitCostDatabase, DiscoError> {
    let mut workbook: Xlsx<_> = calamine::open_workbook(path)
        .map_err(|e| DiscoError::Workbook(format!("{}: {e}", path.display())))?;

    let mut sheet_rows = |sheet: &str| -> Result<Vec<Vec<Data>>, DiscoError> {
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| DiscoError::Workbook(format!("sheet '{sheet}' not found: {e}")))?;
        Ok(range.rows().map(|r| r.to_vec()).collect())
    };

    Ok(UnitCostDatabase {
        lines: parse_rated_rows(LINES_SHEET, &sheet_rows(LINES_SHEET)?, "ampacity", "cost_per_mile", true)?,
        transformers: parse_rated_rows(
            TRANSFORMERS_SHEET,
            &sheet_rows(TRANSFORMERS_SHEET)?,
            "kva",
            "cost_per_unit",
            true,
        )?,
        regulators: parse_rated_rows(
            REGULATORS_SHEET,
            &sheet_rows(REGULATORS_SHEET)?,
            "kva",
            "cost_per_unit",
            false,
        )?,
        capacitors: parse_capacitor_rows(&sheet_rows(CAPACITORS_SHEET)?)?,
    })
}

/// Parse a rated-size sheet. Rows with an empty rating cell end the table.
pub fn parse_rated_rows(
    sheet: &str,
    rows: &[Vec<Data>],
    rating_column: &str,
    cost_column: &str,
    with_phases: bool,
) -> Result<Vec<RatedCost>, DiscoError> {
    let Some((header, body)) = rows.split_first() else {
        return Err(DiscoError::Workbook(format!("sheet '{sheet}' is empty")));
    };
    let rating_idx = column_index(sheet, header, rating_column)?;
    let cost_idx = column_index(sheet, header, cost_column)?;
    let phases_idx = if with_phases {
        Some(column_index(sheet, header, "phases")?)
    } else {
        None
    };

    let mut entries = Vec::new();
    for (i, row) in body.iter().enumerate() {
        let Some(rating) = cell_as_f64(row.get(rating_idx)) else {
            break;
        };
        let cost = cell_as_decimal(row.get(cost_idx)).ok_or_else(|| {
            DiscoError::Workbook(format!("sheet '{sheet}' row {}: missing cost", i + 2))
        })?;
        let phases = match phases_idx {
            Some(idx) => parse_phases(sheet, i + 2, row.get(idx))?,
            None => None,
        };
        entries.push(RatedCost {
            phases,
            rating,
            cost,
        });
    }
    Ok(entries)
}

/// Parse the `capacitors` sheet into action -> unit cost.
pub fn parse_capacitor_rows(rows: &[Vec<Data>]) -> Result<BTreeMap<UpgradeAction, Decimal>, DiscoError> {
    let Some((header, body)) = rows.split_first() else {
        return Err(DiscoError::Workbook(format!(
            "sheet '{CAPACITORS_SHEET}' is empty"
        )));
    };
    let action_idx = column_index(CAPACITORS_SHEET, header, "action")?;
    let cost_idx = column_index(CAPACITORS_SHEET, header, "cost_per_unit")?;

    let mut costs = BTreeMap::new();
    for (i, row) in body.iter().enumerate() {
        let Some(label) = row.get(action_idx).and_then(cell_as_string) else {
            break;
        };
        let action = UpgradeAction::from_str_loose(&label).ok_or_else(|| {
            DiscoError::Workbook(format!(
                "sheet '{CAPACITORS_SHEET}' row {}: unknown action '{label}'",
                i + 2
            ))
        })?;
        let cost = cell_as_decimal(row.get(cost_idx)).ok_or_else(|| {
            DiscoError::Workbook(format!(
                "sheet '{CAPACITORS_SHEET}' row {}: missing cost",
                i + 2
            ))
        })?;
        costs.insert(action, cost);
    }
    Ok(costs)
}

/// Phase count cell: empty means any phase count, otherwise a whole number
/// from 1 to 3.
fn parse_phases(sheet: &str, row_no: usize, cell: Option<&Data>) -> Result<Option<u8>, DiscoError> {
    let cell = match cell {
        None | Some(Data::Empty) => return Ok(None),
        Some(Data::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(cell) => cell,
    };
    match cell_as_f64(Some(cell)) {
        Some(p) if p.fract() == 0.0 && (1.0..=3.0).contains(&p) => Ok(Some(p as u8)),
        _ => Err(DiscoError::Workbook(format!(
            "sheet '{sheet}' row {row_no}: invalid phase count '{cell}'"
        ))),
    }
}

fn column_index(sheet: &str, header: &[Data], column: &str) -> Result<usize, DiscoError> {
    header
        .iter()
        .position(|cell| {
            cell_as_string(cell)
                .map(|s| s.to_lowercase().replace(' ', "_") == column)
                .unwrap_or(false)
        })
        .ok_or_else(|| DiscoError::MissingColumn {
            table: sheet.to_string(),
            column: column.to_string(),
        })
}

fn cell_as_string(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Empty => None,
        _ => Some(format!("{cell}")),
    }
}

fn cell_as_f64(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Money cells may be numbers or text such as "$1,250.00".
fn cell_as_decimal(cell: Option<&Data>) -> Option<Decimal> {
    match cell? {
        Data::Float(f) => f64_to_decimal(*f),
        Data::Int(i) => Some(Decimal::from(*i)),
        Data::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
            Decimal::from_str(cleaned.trim()).ok()
        }
        _ => None,
    }
}

/// Convert f64 to Decimal through its shortest string form so that values
/// such as 0.1 do not pick up binary artifacts. None for NaN, infinities and
/// magnitudes a Decimal cannot hold.
pub(crate) fn f64_to_decimal(f: f64) -> Option<Decimal> {
    if !f.is_finite() {
        return None;
    }
    format!("{f}")
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::try_from(f).ok())
}
