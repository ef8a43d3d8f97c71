mod commands;
mod logging;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "disco",
    version,
    about = "Hosting-capacity and upgrade-cost post-processing for distribution feeder simulations"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate per-job metric files into batch-wide summary tables
    MakeSummaryTables {
        /// JADE output directory (or its job-outputs directory)
        job_outputs: PathBuf,

        /// Directory to write the tables to
        #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
        output_dir: PathBuf,

        /// Worker threads for reading jobs (0 = one per core)
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Overwrite the output directory if it exists
        #[arg(long)]
        force: bool,
    },
    /// Compute hosting capacity per feeder from summary tables
    ComputeHostingCapacity {
        /// Directory written by make-summary-tables
        tables_dir: PathBuf,

        /// Predefined thresholds: snapshot (default), time-series
        #[arg(short, long, value_name = "NAME", conflicts_with = "thresholds")]
        preset: Option<String>,

        /// Custom TOML threshold file
        #[arg(short, long, value_name = "FILE")]
        thresholds: Option<PathBuf>,

        /// Only evaluate rows of this scenario
        #[arg(long)]
        scenario: Option<String>,

        /// Only evaluate these node types (repeatable)
        #[arg(long = "node-type", value_name = "TYPE")]
        node_types: Vec<String>,

        /// Directory to write results to
        #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
        output_dir: PathBuf,

        /// Overwrite the output directory if it exists
        #[arg(long)]
        force: bool,

        /// Terminal output format: table (default) or json
        #[arg(long, default_value = "table")]
        output: String,
    },
    /// Price equipment upgrades with a unit cost workbook
    ComputeUpgradeCost {
        /// JADE output directory (or its job-outputs directory)
        job_outputs: PathBuf,

        /// Unit cost workbook (.xlsx)
        #[arg(long, value_name = "FILE")]
        unit_costs: PathBuf,

        /// Directory to write results to
        #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
        output_dir: PathBuf,

        /// Worker threads for reading jobs (0 = one per core)
        #[arg(long, default_value_t = 0)]
        threads: usize,

        /// Overwrite the output directory if it exists
        #[arg(long)]
        force: bool,

        /// Terminal output format: table (default) or json
        #[arg(long, default_value = "table")]
        output: String,
    },
    /// Extract upgrade results from a PyDSS project archive
    ExtractUpgrades {
        /// Path to project.zip
        project_zip: PathBuf,

        /// Directory to extract into (files land in <DIR>/upgrades/)
        #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
        output_dir: PathBuf,
    },
    /// Inspect and validate threshold configurations
    Thresholds {
        #[command(subcommand)]
        action: ThresholdsAction,
    },
}

#[derive(Subcommand)]
enum ThresholdsAction {
    /// List predefined threshold sets
    List,
    /// Print the limits of a predefined threshold set
    Show {
        /// Preset name (e.g., "snapshot")
        preset: String,
    },
    /// Validate a custom TOML threshold file
    Validate {
        /// Path to TOML threshold file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::MakeSummaryTables {
            job_outputs,
            output_dir,
            threads,
            force,
        } => commands::summary_tables::run(&job_outputs, &output_dir, threads, force),
        Commands::ComputeHostingCapacity {
            tables_dir,
            preset,
            thresholds,
            scenario,
            node_types,
            output_dir,
            force,
            output,
        } => commands::hosting_capacity::run(commands::hosting_capacity::Args {
            tables_dir,
            preset,
            thresholds,
            scenario,
            node_types,
            output_dir,
            force,
            output_format: output,
        }),
        Commands::ComputeUpgradeCost {
            job_outputs,
            unit_costs,
            output_dir,
            threads,
            force,
            output,
        } => commands::upgrade_cost::run(
            &job_outputs,
            &unit_costs,
            &output_dir,
            threads,
            force,
            &output,
        ),
        Commands::ExtractUpgrades {
            project_zip,
            output_dir,
        } => commands::extract::run(&project_zip, &output_dir),
        Commands::Thresholds { action } => match action {
            ThresholdsAction::List => commands::thresholds::list(),
            ThresholdsAction::Show { preset } => commands::thresholds::show(&preset),
            ThresholdsAction::Validate { file } => commands::thresholds::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
