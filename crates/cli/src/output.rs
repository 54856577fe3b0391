//! CLI output formatting utilities.
//!
//! Colored status lines for per-snap outcomes and run totals, plus JSON
//! output for scripting.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use poller_lib::poll::{Outcome, PackageRecord, RunSummary};
use poller_lib::report;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const BUILT: &str = "✓";
  pub const ERRORED: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const NOTE: &str = "•";
  pub const WOULD_BUILD: &str = "→";
  pub const SKIPPED: &str = "-";
}

/// How a line should stand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
  Good,
  Bad,
  Caution,
  Note,
  Quiet,
}

impl Tone {
  pub fn of(outcome: Outcome) -> Self {
    match outcome {
      Outcome::Built => Tone::Good,
      Outcome::WouldBuild | Outcome::AlreadyBuilding => Tone::Note,
      Outcome::Skipped => Tone::Quiet,
      Outcome::Errored => Tone::Bad,
    }
  }

  /// Problems go to stderr so stdout stays a clean report.
  fn stream(self) -> Stream {
    match self {
      Tone::Bad | Tone::Caution => Stream::Stderr,
      _ => Stream::Stdout,
    }
  }

  fn paint(self, text: &str, stream: Stream) -> String {
    match self {
      Tone::Good => text.if_supports_color(stream, |s| s.green()).to_string(),
      Tone::Bad => text.if_supports_color(stream, |s| s.red()).to_string(),
      Tone::Caution => text.if_supports_color(stream, |s| s.yellow()).to_string(),
      Tone::Note => text.if_supports_color(stream, |s| s.blue()).to_string(),
      Tone::Quiet => text.if_supports_color(stream, |s| s.dimmed()).to_string(),
    }
  }
}

pub fn outcome_symbol(outcome: Outcome) -> &'static str {
  match outcome {
    Outcome::Built => symbols::BUILT,
    Outcome::WouldBuild => symbols::WOULD_BUILD,
    Outcome::AlreadyBuilding => symbols::NOTE,
    Outcome::Skipped => symbols::SKIPPED,
    Outcome::Errored => symbols::ERRORED,
  }
}

/// Elapsed time at millisecond precision, e.g. `1m 5s 20ms`.
pub fn format_elapsed(elapsed: Duration) -> String {
  let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
  humantime::format_duration(Duration::from_millis(millis)).to_string()
}

/// `name (outcome: reason)`, preferring the store name.
pub fn record_line(record: &PackageRecord) -> String {
  let name = record.store_name.as_deref().unwrap_or(&record.name);
  format!("{} ({}: {})", name, record.outcome, record.reason)
}

/// One line per snap: symbol, name, outcome and reason.
pub fn print_record(record: &PackageRecord) {
  let tone = Tone::of(record.outcome);
  let symbol = tone.paint(outcome_symbol(record.outcome), Stream::Stdout);
  println!("  {} {}", symbol, Tone::Quiet.paint(&record_line(record), Stream::Stdout));
}

/// A symbol-led status line, on stderr for bad news.
pub fn print_status(tone: Tone, symbol: &str, message: &str) {
  let stream = tone.stream();
  let line = format!("{} {}", tone.paint(symbol, stream), message);
  match stream {
    Stream::Stderr => eprintln!("{line}"),
    _ => println!("{line}"),
  }
}

/// The totals line, flagged when anything went wrong.
pub fn print_totals(summary: &RunSummary) {
  let totals = report::format_totals(summary);
  if summary.errored > 0 || summary.aborted {
    print_status(Tone::Caution, symbols::WARNING, &totals);
  } else {
    print_status(Tone::Good, symbols::BUILT, &totals);
  }
}

pub fn print_field(label: &str, value: &str) {
  println!("  {}: {}", Tone::Quiet.paint(label, Stream::Stdout), value);
}

/// The full summary, records included, as pretty JSON on stdout.
pub fn print_summary_json(summary: &RunSummary) -> anyhow::Result<()> {
  let mut out = io::stdout().lock();
  serde_json::to_writer_pretty(&mut out, summary).context("Failed to serialize run summary")?;
  writeln!(out).context("Failed to write run summary")?;
  Ok(())
}
