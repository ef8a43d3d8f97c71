use crate::error::DiscoError;
use crate::loaders::csv_table::read_metric_table_file;
use crate::model::{MetadataRow, MetricTable};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const JOB_METADATA_FILE: &str = "job_metadata.json";
pub const JOB_OUTPUTS_DIR: &str = "job-outputs";
const JOB_METRICS_SUFFIX: &str = "_metrics.csv";

/// Outputs of a single simulation job.
#[derive(Debug, Clone)]
pub struct JobOutputs {
    pub job_name: String,
    pub directory: PathBuf,
    pub metadata: MetadataRow,
    pub tables: BTreeMap<String, MetricTable>,
}

/// Resolve the directory holding one subdirectory per job.
///
/// Accepts either the JADE output directory (which contains `job-outputs/`)
/// or the `job-outputs` directory itself.
pub fn job_outputs_root(output_dir: &Path) -> PathBuf {
    let nested = output_dir.join(JOB_OUTPUTS_DIR);
    if nested.is_dir() {
        nested
    } else {
        output_dir.to_path_buf()
    }
}

/// List job directories (those carrying `job_metadata.json`), sorted by name.
pub fn discover_jobs(output_dir: &Path) -> Result<Vec<PathBuf>, DiscoError> {
    let root = job_outputs_root(output_dir);
    let mut jobs = Vec::new();
    for entry in fs::read_dir(&root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if path.join(JOB_METADATA_FILE).is_file() {
            jobs.push(path);
        } else {
            debug!(dir = %path.display(), "skipping directory without job metadata");
        }
    }
    jobs.sort();
    Ok(jobs)
}

/// Read the metadata and every `<class>_metrics.csv` file of one job.
pub fn load_job(job_dir: &Path) -> Result<JobOutputs, DiscoError> {
    let job_name = job_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let metadata_path = job_dir.join(JOB_METADATA_FILE);
    let metadata: MetadataRow = serde_json::from_slice(&fs::read(&metadata_path)?)
        .map_err(|e| DiscoError::parse(metadata_path.display().to_string(), e.to_string()))?;
    let key = metadata.key();

    let mut tables = BTreeMap::new();
    for entry in fs::read_dir(job_dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(class) = file_name.strip_suffix(JOB_METRICS_SUFFIX) else {
            continue;
        };
        let table = read_metric_table_file(&path, class, Some(&key))?;
        debug!(job = %job_name, class, rows = table.rows.len(), "read job metrics");
        tables.insert(class.to_string(), table);
    }

    Ok(JobOutputs {
        job_name,
        directory: job_dir.to_path_buf(),
        metadata,
        tables,
    })
}

/// Load every job under `output_dir` on a rayon pool.
///
/// `threads == 0` uses one thread per core. Results come back sorted by job
/// name regardless of completion order.
pub fn load_all_jobs(output_dir: &Path, threads: usize) -> Result<Vec<JobOutputs>, DiscoError> {
    let job_dirs = discover_jobs(output_dir)?;
    if job_dirs.is_empty() {
        return Err(DiscoError::NoMatches);
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| DiscoError::AnalysisRun(format!("building thread pool: {e}")))?;

    let results: Vec<Result<JobOutputs, DiscoError>> =
        pool.install(|| job_dirs.par_iter().map(|dir| load_job(dir)).collect());

    let mut jobs = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    jobs.sort_by(|a, b| a.job_name.cmp(&b.job_name));
    info!(jobs = jobs.len(), root = %output_dir.display(), "loaded job outputs");
    Ok(jobs)
}
