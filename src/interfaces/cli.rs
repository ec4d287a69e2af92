use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "leadboard")]
#[command(about = "Lead capture API and sales dashboard backend.")]
#[command(version)]
pub struct Cli {
    /// Load the SQL dumps into the database and exit
    #[arg(long)]
    pub seed: bool,

    /// Directory holding the SQL dumps (overrides config)
    #[arg(long, value_name = "DIR")]
    pub seed_dir: Option<PathBuf>,

    /// Generate config sample
    #[arg(long)]
    pub generate_config: bool,

    /// Show status
    #[arg(long)]
    pub status: bool,

    /// Config file to use instead of the default location
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short = 'b', long, value_name = "ADDR")]
    pub bind: Option<String>,
}
