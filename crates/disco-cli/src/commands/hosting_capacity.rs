use disco_core::error::DiscoError;
use disco_core::loaders::load_tables_dir;
use disco_core::thresholds::builtin;
use disco_core::thresholds::schema::ThresholdConfig;
use disco_core::{writers, HostingCapacityOptions};
use std::path::PathBuf;
use tracing::info;

use crate::output;

const DEFAULT_PRESET: &str = "snapshot";

pub struct Args {
    pub tables_dir: PathBuf,
    pub preset: Option<String>,
    pub thresholds: Option<PathBuf>,
    pub scenario: Option<String>,
    pub node_types: Vec<String>,
    pub output_dir: PathBuf,
    pub force: bool,
    pub output_format: String,
}

pub fn run(args: Args) -> Result<(), DiscoError> {
    let thresholds: ThresholdConfig = match (&args.thresholds, &args.preset) {
        (Some(path), _) => disco_core::thresholds::load_thresholds(path)?,
        (None, Some(preset)) => builtin::load_preset(preset)?,
        (None, None) => builtin::load_preset(DEFAULT_PRESET)?,
    };

    let tables = load_tables_dir(&args.tables_dir)?;
    let options = HostingCapacityOptions {
        scenario: args.scenario,
        node_types: args.node_types,
    };
    let analysis = disco_core::compute_hosting_capacity(&tables, &thresholds, &options)?;

    writers::prepare_output_dir(&args.output_dir, args.force)?;
    writers::write_hc_summary(&analysis.report.summary_rows(), &args.output_dir)?;
    writers::write_class_results(analysis.report.all_results(), &args.output_dir)?;
    writers::write_impact_summaries(&analysis.impact, &args.output_dir)?;
    info!(dir = %args.output_dir.display(), "wrote hosting capacity results");

    match args.output_format.as_str() {
        "json" => output::json::print(&analysis.report)?,
        _ => output::table::print_hosting_capacity(&analysis.report),
    }
    Ok(())
}
