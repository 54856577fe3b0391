//! Run reports: the totals line and the per-snap CSV export.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::poll::{PackageRecord, RunSummary};

#[derive(Debug, Error)]
pub enum ReportError {
  #[error("failed to write report to {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: csv::Error,
  },

  #[error("failed to write report: {0}")]
  Csv(#[from] csv::Error),

  #[error("failed to flush report: {0}")]
  Io(#[from] io::Error),
}

/// One-line totals, e.g. `3 snaps checked: 1 built, 2 skipped, 0 errored`.
pub fn format_totals(summary: &RunSummary) -> String {
  let mut line = format!(
    "{} snaps checked: {} built, {} skipped, {} errored",
    summary.checked(),
    summary.built,
    summary.skipped,
    summary.errored
  );
  if summary.checked() < summary.total {
    line.push_str(&format!(" ({} not checked)", summary.total - summary.checked()));
  }
  line
}

/// Write one CSV row per snap, with a header, to `writer`.
pub fn write_csv_to<W: io::Write>(writer: W, records: &[PackageRecord]) -> Result<(), ReportError> {
  let mut csv = csv::Writer::from_writer(writer);
  for record in records {
    csv.serialize(record)?;
  }
  csv.flush()?;
  Ok(())
}

/// Export the per-snap records of `summary` to a CSV file at `path`.
pub fn write_csv(path: &Path, summary: &RunSummary) -> Result<(), ReportError> {
  let wrap = |source| ReportError::Write {
    path: path.to_path_buf(),
    source,
  };

  let mut csv = csv::Writer::from_path(path).map_err(wrap)?;
  for record in &summary.records {
    csv.serialize(record).map_err(wrap)?;
  }
  csv.flush()?;

  info!(path = %path.display(), rows = summary.records.len(), "wrote CSV report");
  Ok(())
}
