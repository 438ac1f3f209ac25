use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "f1-manager",
    about = "Simulates the next phase of a race weekend with concurrent car workers"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Answer the start confirmation with yes
    #[clap(short, long)]
    pub yes: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set directory holding drivers.csv, tracks.csv, championship.txt and the result files
    #[clap(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Set path to a JSON file overriding session parameters (OPTIONAL)
    #[clap(short, long)]
    pub parfile_path: Option<PathBuf>,

    /// Set real-time factor, i.e. simulated seconds per wall-clock second
    #[clap(short, long, default_value = "60.0")]
    pub realtime_factor: f64,
}
