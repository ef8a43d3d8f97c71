use disco_core::error::DiscoError;
use disco_core::writers;
use std::path::Path;

use crate::output;

pub fn run(
    job_outputs: &Path,
    unit_costs: &Path,
    output_dir: &Path,
    threads: usize,
    force: bool,
    output_format: &str,
) -> Result<(), DiscoError> {
    let report = disco_core::compute_upgrade_costs(job_outputs, unit_costs, threads)?;

    writers::prepare_output_dir(output_dir, force)?;
    writers::write_cost_report(&report, output_dir)?;

    match output_format {
        "json" => output::json::print(&report)?,
        _ => output::table::print_costs(&report),
    }
    Ok(())
}
