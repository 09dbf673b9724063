use clap::{Args, Parser, Subcommand};
use fnirs_blocks::Chromophore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fnirs-toolkit",
    version,
    about = "fNIRS hemoglobin block averages, region tables and heatmaps",
    long_about = "Aggregate conditioned fNIRS hemoglobin recordings into block averages.\n\
                  Writes a detailed trial/channel x block table and, with a channel\n\
                  mapping, one table and heatmap per brain region."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process every recording in a directory into pivot tables and heatmaps
    Process(ProcessArgs),
    /// Check that a single recording can be processed
    Validate(ValidateArgs),
    /// List the regions and channels defined by a mapping file
    Regions(RegionsArgs),
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Directory containing hemoglobin recording exports
    pub input_dir: PathBuf,

    /// Output directory for data/ and figures/
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Channel-to-region mapping JSON file
    #[arg(short, long, env = "FNIRS_MAPPING")]
    pub mapping: Option<PathBuf>,

    /// Hemoglobin species to tabulate (hbo, hbr)
    #[arg(long, default_value_t = Chromophore::HbO)]
    pub chromophore: Chromophore,

    /// File pattern matched inside the input directory
    #[arg(long, default_value = "*.json")]
    pub pattern: String,

    /// Worker threads for per-recording extraction
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip heatmap rendering
    #[arg(long, default_value_t = false)]
    pub no_heatmaps: bool,

    /// Also write a machine-readable run summary to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Suppress progress messages on stderr
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Recording export to check
    pub file: PathBuf,

    /// Hemoglobin species to check for (hbo, hbr)
    #[arg(long, default_value_t = Chromophore::HbO)]
    pub chromophore: Chromophore,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct RegionsArgs {
    /// Channel-to-region mapping JSON file
    pub mapping: PathBuf,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
