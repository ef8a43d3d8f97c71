use disco_core::error::DiscoError;
use disco_core::writers;
use std::path::Path;

pub fn run(job_outputs: &Path, output_dir: &Path, threads: usize, force: bool) -> Result<(), DiscoError> {
    let tables = disco_core::make_summary_tables(job_outputs, threads)?;

    writers::prepare_output_dir(output_dir, force)?;
    let written = writers::write_summary_tables(&tables, output_dir)?;

    for (class, table) in &tables.metrics {
        println!(
            "  {:<12} {:>6} rows  {} metrics",
            class,
            table.rows.len(),
            table.metrics.len()
        );
    }
    println!(
        "\nWrote {} files for {} deployments to {}",
        written.len(),
        tables.metadata.len(),
        output_dir.display()
    );
    Ok(())
}
