use crate::error::DiscoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const UPGRADES_DIR: &str = "upgrades";
pub const UPGRADE_FILE_SUFFIX: &str = "_upgrades.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentType {
    Line,
    Transformer,
    Regulator,
    Capacitor,
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquipmentType::Line => write!(f, "line"),
            EquipmentType::Transformer => write!(f, "transformer"),
            EquipmentType::Regulator => write!(f, "regulator"),
            EquipmentType::Capacitor => write!(f, "capacitor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeAction {
    New,
    Upgrade,
    /// Capacitor setting change without new hardware.
    ControlChange,
}

impl fmt::Display for UpgradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeAction::New => write!(f, "new"),
            UpgradeAction::Upgrade => write!(f, "upgrade"),
            UpgradeAction::ControlChange => write!(f, "control_change"),
        }
    }
}

impl UpgradeAction {
    pub fn from_str_loose(s: &str) -> Option<UpgradeAction> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "new" => Some(UpgradeAction::New),
            "upgrade" | "upgraded" => Some(UpgradeAction::Upgrade),
            "control_change" | "control" => Some(UpgradeAction::ControlChange),
            _ => None,
        }
    }
}

/// One equipment change written by the upgrade simulation.
///
/// Counts are signed so that bad input reaches the cost engine's sanity
/// check instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "equipment_type", rename_all = "snake_case")]
pub enum UpgradeRecord {
    Line {
        name: String,
        action: UpgradeAction,
        count: i64,
        phases: u8,
        ampacity: f64,
        length_ft: f64,
    },
    Transformer {
        name: String,
        action: UpgradeAction,
        count: i64,
        phases: u8,
        kva: f64,
    },
    Regulator {
        name: String,
        action: UpgradeAction,
        count: i64,
        kva: f64,
    },
    Capacitor {
        name: String,
        action: UpgradeAction,
        count: i64,
    },
}

impl UpgradeRecord {
    pub fn name(&self) -> &str {
        match self {
            UpgradeRecord::Line { name, .. }
            | UpgradeRecord::Transformer { name, .. }
            | UpgradeRecord::Regulator { name, .. }
            | UpgradeRecord::Capacitor { name, .. } => name,
        }
    }

    pub fn action(&self) -> UpgradeAction {
        match self {
            UpgradeRecord::Line { action, .. }
            | UpgradeRecord::Transformer { action, .. }
            | UpgradeRecord::Regulator { action, .. }
            | UpgradeRecord::Capacitor { action, .. } => *action,
        }
    }

    pub fn count(&self) -> i64 {
        match self {
            UpgradeRecord::Line { count, .. }
            | UpgradeRecord::Transformer { count, .. }
            | UpgradeRecord::Regulator { count, .. }
            | UpgradeRecord::Capacitor { count, .. } => *count,
        }
    }

    pub fn equipment_type(&self) -> EquipmentType {
        match self {
            UpgradeRecord::Line { .. } => EquipmentType::Line,
            UpgradeRecord::Transformer { .. } => EquipmentType::Transformer,
            UpgradeRecord::Regulator { .. } => EquipmentType::Regulator,
            UpgradeRecord::Capacitor { .. } => EquipmentType::Capacitor,
        }
    }
}

/// Parse an upgrade file: a JSON array of records.
pub fn parse_upgrades(json: &[u8], source_name: &str) -> Result<Vec<UpgradeRecord>, DiscoError> {
    serde_json::from_slice(json).map_err(|e| DiscoError::parse(source_name, e.to_string()))
}

pub fn read_upgrade_file(path: &Path) -> Result<Vec<UpgradeRecord>, DiscoError> {
    let bytes = std::fs::read(path)?;
    parse_upgrades(&bytes, &path.display().to_string())
}

/// Find `*_upgrades.json` files under a job's `upgrades/` directory, sorted.
///
/// A job without the directory has no upgrades; any other traversal error
/// is returned.
pub fn find_upgrade_files(job_dir: &Path) -> Result<Vec<PathBuf>, DiscoError> {
    let root = job_dir.join(UPGRADES_DIR);
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
            DiscoError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{}: {e}", path.display()),
            ))
        })?;
        let is_upgrade_file = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.ends_with(UPGRADE_FILE_SUFFIX));
        if is_upgrade_file {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
