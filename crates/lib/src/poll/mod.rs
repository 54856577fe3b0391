//! The run driver.
//!
//! Lists every snap owned by the build account, evaluates each one and
//! triggers the builds that are needed. Per-snap failures are counted and the
//! run moves on; a rate-limited GitHub aborts the whole run.

mod summary;

pub use summary::{Outcome, PackageRecord, RunSummary};

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span};

use crate::consts::DEFAULT_THRESHOLD_HOURS;
use crate::decide::{EvaluateError, Evaluator};
use crate::github::Inspector;
use crate::launchpad::{Package, Registry, RegistryError};

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum PollError {
  #[error("failed to list snaps: {0}")]
  ListPackages(#[source] RegistryError),

  #[error("GitHub API rate limit exceeded after {} of {} snaps", .summary.checked(), .summary.total)]
  RateLimited { summary: Box<RunSummary> },
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct PollOptions {
  /// Snaps built after this instant are not rebuilt.
  pub threshold: DateTime<Utc>,
  /// Evaluations in flight at once. Values below 1 are treated as 1.
  pub jobs: usize,
  /// Evaluate and report, but never trigger builds.
  pub dry_run: bool,
}

impl PollOptions {
  /// Threshold `hours` before now.
  pub fn with_threshold_hours(hours: i64) -> Self {
    Self {
      threshold: Utc::now() - Duration::hours(hours),
      ..Default::default()
    }
  }
}

impl Default for PollOptions {
  fn default() -> Self {
    Self {
      threshold: Utc::now() - Duration::hours(DEFAULT_THRESHOLD_HOURS),
      jobs: 1,
      dry_run: false,
    }
  }
}

pub struct Poller<'a> {
  inspector: &'a Inspector,
  registry: &'a dyn Registry,
  options: PollOptions,
}

impl<'a> Poller<'a> {
  pub fn new(inspector: &'a Inspector, registry: &'a dyn Registry, options: PollOptions) -> Self {
    Self {
      inspector,
      registry,
      options,
    }
  }

  /// Check every snap and trigger the builds that are needed.
  ///
  /// Results are consumed in listing order. On a rate limit no further snap
  /// is started, but checks already in flight run to completion so that any
  /// build they triggered is recorded. The partial summary is returned inside
  /// the error.
  pub async fn run(&self) -> Result<RunSummary, PollError> {
    let packages = self.registry.list_packages().await.map_err(PollError::ListPackages)?;
    let total = packages.len();
    info!(total, threshold = %self.options.threshold, dry_run = self.options.dry_run, "checking snaps");

    let evaluator = Evaluator::new(self.inspector, self.registry, self.options.threshold);
    let mut summary = RunSummary::new(total, self.options.threshold, self.options.dry_run);
    let stopped = AtomicBool::new(false);

    let mut results = stream::iter(packages.iter().enumerate())
      .map(|(index, package)| {
        let span = info_span!("package", current = index + 1, total, snap = %package.display_name());
        let stopped = &stopped;
        let evaluator = &evaluator;
        async move {
          if stopped.load(Ordering::Acquire) {
            return (package, None);
          }
          let result = self.check(evaluator, package).await;
          if matches!(&result, Err(e) if e.is_rate_limit()) {
            stopped.store(true, Ordering::Release);
          }
          (package, Some(result))
        }
        .instrument(span)
      })
      .buffered(self.options.jobs.max(1));

    while let Some((package, result)) = results.next().await {
      match result {
        None => {}
        Some(Ok(record)) => summary.record(record),
        Some(Err(e)) if e.is_rate_limit() => {
          if !summary.aborted {
            error!(snap = %package.display_name(), "GitHub API rate limit exceeded, aborting");
            summary.aborted = true;
          }
        }
        Some(Err(e)) => {
          error!(
            snap = %package.display_name(),
            launchpad_name = %package.name,
            repository = package.git_repository_url.as_deref().unwrap_or_default(),
            error = %e,
            "failed to check snap"
          );
          summary.record(PackageRecord::new(package, Outcome::Errored, e.to_string()));
        }
      }
    }

    if summary.aborted {
      return Err(PollError::RateLimited {
        summary: Box::new(summary),
      });
    }

    info!(
      total = summary.total,
      built = summary.built,
      skipped = summary.skipped,
      errored = summary.errored,
      "finished checking snaps"
    );
    Ok(summary)
  }

  async fn check(&self, evaluator: &Evaluator<'_>, package: &Package) -> Result<PackageRecord, EvaluateError> {
    let decision = evaluator.evaluate(package).await?;
    let reason = decision.reason.to_string();
    if !decision.needs_building {
      return Ok(PackageRecord::new(package, Outcome::Skipped, reason));
    }

    let store_name = package.display_name();
    if self.registry.is_building(store_name).await? {
      info!(%reason, "already building");
      return Ok(PackageRecord::new(package, Outcome::AlreadyBuilding, reason));
    }

    if self.options.dry_run {
      info!(%reason, "would trigger build");
      return Ok(PackageRecord::new(package, Outcome::WouldBuild, reason));
    }

    debug!("requesting builds");
    self.registry.trigger_build(store_name).await?;
    info!(%reason, "triggered build");
    Ok(PackageRecord::new(package, Outcome::Built, reason))
  }
}
