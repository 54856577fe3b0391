//! The poll run: check every snap and trigger the builds that are needed.

use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use tracing::info;

use poller_lib::config::PollerConfig;
use poller_lib::github::{GitHubClient, Inspector};
use poller_lib::launchpad::Launchpad;
use poller_lib::poll::{Outcome, PollError, PollOptions, Poller, RunSummary};
use poller_lib::report;

use crate::output::{
  OutputFormat, Tone, format_elapsed, print_field, print_record, print_status, print_summary_json, print_totals, symbols,
};

pub struct RunArgs {
  pub threshold_hours: i64,
  pub jobs: usize,
  pub dry_run: bool,
  pub csv: Option<PathBuf>,
  pub output: OutputFormat,
  pub verbose: bool,
}

pub async fn cmd_run(args: RunArgs) -> Result<()> {
  let config = PollerConfig::from_env().context("Failed to load configuration")?;
  let started = Instant::now();

  let github = GitHubClient::new(config.tokens, &config.github).context("Failed to create GitHub client")?;
  let inspector = Inspector::new(github);
  let launchpad =
    Launchpad::new(config.credentials, &config.launchpad).context("Failed to create Launchpad client")?;

  let options = PollOptions {
    threshold: Utc::now() - Duration::hours(args.threshold_hours),
    jobs: args.jobs,
    dry_run: args.dry_run,
  };

  let (summary, rate_limited) = match Poller::new(&inspector, &launchpad, options).run().await {
    Ok(summary) => (summary, false),
    Err(PollError::RateLimited { summary }) => (*summary, true),
    Err(e) => return Err(e).context("Poll run failed"),
  };

  if let Some(path) = &args.csv {
    report::write_csv(path, &summary).with_context(|| format!("Failed to export {}", path.display()))?;
  }

  if args.output.is_json() {
    print_summary_json(&summary)?;
  } else {
    print_summary(&summary, &args, started);
  }

  if rate_limited {
    print_status(Tone::Bad, symbols::ERRORED, "GitHub API rate limit exceeded, run aborted");
    bail!("rate limited after checking {} of {} snaps", summary.checked(), summary.total);
  }

  info!(elapsed = %format_elapsed(started.elapsed()), "run complete");
  Ok(())
}

fn print_summary(summary: &RunSummary, args: &RunArgs, started: Instant) {
  if summary.dry_run {
    print_status(Tone::Note, symbols::NOTE, "Dry run: no builds were requested");
  }

  for record in &summary.records {
    if args.verbose || record.outcome != Outcome::Skipped {
      print_record(record);
    }
  }

  print_totals(summary);

  if summary.already_building > 0 {
    print_field("Already building", &summary.already_building.to_string());
  }
  if summary.would_build > 0 {
    print_field("Would build", &summary.would_build.to_string());
  }
  print_field(
    "Threshold",
    &humantime::format_rfc3339_seconds(SystemTime::from(summary.threshold)).to_string(),
  );
  print_field("Duration", &format_elapsed(started.elapsed()));
  if let Some(path) = &args.csv {
    print_field("CSV report", &path.display().to_string());
  }
}
