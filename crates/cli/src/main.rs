mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use poller_lib::consts::DEFAULT_THRESHOLD_HOURS;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// snap-poller - Trigger Launchpad builds for snaps whose GitHub sources changed
#[derive(Parser)]
#[command(name = "snap-poller")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (RUST_LOG overrides)
  #[arg(short, long)]
  verbose: bool,

  /// Skip snaps built within this many hours
  #[arg(long, value_name = "HOURS", default_value_t = DEFAULT_THRESHOLD_HOURS, value_parser = clap::value_parser!(i64).range(0..))]
  threshold_hours: i64,

  /// Number of snaps checked concurrently
  #[arg(short, long, value_name = "N", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=64))]
  jobs: u32,

  /// Check snaps and report, but never request builds
  #[arg(long)]
  dry_run: bool,

  /// Export per-snap results to a CSV file
  #[arg(long, value_name = "PATH")]
  csv: Option<PathBuf>,

  /// Summary format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  cmd::cmd_run(cmd::RunArgs {
    threshold_hours: cli.threshold_hours,
    jobs: cli.jobs as usize,
    dry_run: cli.dry_run,
    csv: cli.csv,
    output: cli.output,
    verbose: cli.verbose,
  })
  .await
}
