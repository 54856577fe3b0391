//! Per-run results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::launchpad::Package;

/// What happened to one snap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
  Built,
  AlreadyBuilding,
  WouldBuild,
  Skipped,
  Errored,
}

impl Outcome {
  pub fn as_str(self) -> &'static str {
    match self {
      Outcome::Built => "built",
      Outcome::AlreadyBuilding => "already-building",
      Outcome::WouldBuild => "would-build",
      Outcome::Skipped => "skipped",
      Outcome::Errored => "errored",
    }
  }
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
  /// Launchpad recipe name.
  pub name: String,
  pub store_name: Option<String>,
  pub repository: Option<String>,
  pub outcome: Outcome,
  pub reason: String,
}

impl PackageRecord {
  pub fn new(package: &Package, outcome: Outcome, reason: impl Into<String>) -> Self {
    Self {
      name: package.name.clone(),
      store_name: package.store_name.clone(),
      repository: package.git_repository_url.clone(),
      outcome,
      reason: reason.into(),
    }
  }
}

/// Totals and per-snap records of a run.
///
/// `skipped` includes snaps that were already building and, in a dry run,
/// snaps that would have been built. Those are also counted separately.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
  pub total: usize,
  pub built: usize,
  pub skipped: usize,
  pub errored: usize,
  pub already_building: usize,
  pub would_build: usize,
  pub dry_run: bool,
  /// Set when the run stopped on a rate limit before checking every snap.
  pub aborted: bool,
  pub threshold: DateTime<Utc>,
  pub records: Vec<PackageRecord>,
}

impl RunSummary {
  pub fn new(total: usize, threshold: DateTime<Utc>, dry_run: bool) -> Self {
    Self {
      total,
      built: 0,
      skipped: 0,
      errored: 0,
      already_building: 0,
      would_build: 0,
      dry_run,
      aborted: false,
      threshold,
      records: Vec::with_capacity(total),
    }
  }

  /// Snaps with a result so far.
  pub fn checked(&self) -> usize {
    self.records.len()
  }

  pub fn record(&mut self, record: PackageRecord) {
    match record.outcome {
      Outcome::Built => self.built += 1,
      Outcome::Skipped => self.skipped += 1,
      Outcome::Errored => self.errored += 1,
      Outcome::AlreadyBuilding => {
        self.already_building += 1;
        self.skipped += 1;
      }
      Outcome::WouldBuild => {
        self.would_build += 1;
        self.skipped += 1;
      }
    }
    self.records.push(record);
  }
}
