//! CLI argument parsing with clap.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "riskwatch")]
#[command(author, about = "Watch log files for risk-listed IPs and send alerts")]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Print version and exit
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Debug output (overrides the configured log level)
    #[arg(long)]
    pub verbose: bool,

    /// Errors only (overrides the configured log level)
    #[arg(short, long)]
    pub quiet: bool,
}
