pub mod engine;
pub mod unit_costs;
pub mod upgrades;

pub use engine::{aggregate_costs, price_record, CategoryCost, CostItem, CostReport, JobCost};
pub use unit_costs::{load_unit_costs, RatedCost, UnitCostDatabase};
pub use upgrades::{EquipmentType, UpgradeAction, UpgradeRecord};

use crate::archive::{extract_upgrades, PROJECT_ZIP};
use crate::error::DiscoError;
use crate::loaders::job_outputs::job_outputs_root;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Upgrade records of one job.
pub type JobUpgrades = (String, Vec<UpgradeRecord>);

fn job_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Job directories that hold upgrade results, either already extracted or
/// still inside the project archive. Sorted by name.
pub fn discover_upgrade_jobs(output_dir: &Path) -> Result<Vec<PathBuf>, DiscoError> {
    let root = job_outputs_root(output_dir);
    let mut jobs = Vec::new();
    for entry in fs::read_dir(&root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if path.join(upgrades::UPGRADES_DIR).is_dir() || path.join(PROJECT_ZIP).is_file() {
            jobs.push(path);
        } else {
            debug!(dir = %path.display(), "skipping directory without upgrade results");
        }
    }
    jobs.sort();
    Ok(jobs)
}

/// Read every upgrade file of one job, extracting them from the project
/// archive first when needed.
pub fn load_job_upgrades(job_dir: &Path) -> Result<JobUpgrades, DiscoError> {
    let zip_path = job_dir.join(PROJECT_ZIP);
    if !job_dir.join(upgrades::UPGRADES_DIR).is_dir() && zip_path.is_file() {
        extract_upgrades(&zip_path, job_dir)?;
    }

    let mut records = Vec::new();
    for file in upgrades::find_upgrade_files(job_dir)? {
        records.extend(upgrades::read_upgrade_file(&file)?);
    }
    Ok((job_name(job_dir), records))
}

/// Load upgrade records of every job under `output_dir` on a rayon pool.
/// `threads == 0` uses one thread per core.
pub fn load_all_upgrades(output_dir: &Path, threads: usize) -> Result<Vec<JobUpgrades>, DiscoError> {
    let job_dirs = discover_upgrade_jobs(output_dir)?;
    if job_dirs.is_empty() {
        return Err(DiscoError::NoMatches);
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| DiscoError::AnalysisRun(format!("building thread pool: {e}")))?;

    let results: Vec<Result<JobUpgrades, DiscoError>> =
        pool.install(|| job_dirs.par_iter().map(|dir| load_job_upgrades(dir)).collect());

    let mut jobs = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    jobs.sort_by(|a, b| a.0.cmp(&b.0));
    info!(
        jobs = jobs.len(),
        records = jobs.iter().map(|(_, r)| r.len()).sum::<usize>(),
        "loaded upgrade results"
    );
    Ok(jobs)
}
