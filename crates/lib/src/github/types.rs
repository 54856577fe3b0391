//! GitHub API payloads and the commit type derived from them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Why a repository (or one of its branches) cannot be used.
///
/// These are recoverable: the affected snap or part is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRepository {
  #[error("the repository doesn't exist or is not accessible")]
  NotFound,

  #[error("the branch '{0}' doesn't exist")]
  BranchNotFound(String),

  #[error("missing snapcraft.yaml")]
  MissingManifest,

  #[error("error while parsing snapcraft.yaml: {0}")]
  ManifestParse(String),

  #[error("invalid snapcraft.yaml: top level is not a mapping")]
  ManifestNotMapping,

  #[error("name mismatch: the snapcraft.yaml uses the snap name \"{declared}\", but the user registered the name \"{expected}\"")]
  NameMismatch { declared: String, expected: String },
}

/// Errors raised while talking to GitHub.
#[derive(Debug, Error)]
pub enum GitHubError {
  #[error("invalid repository: {0}")]
  Invalid(#[from] InvalidRepository),

  #[error("GitHub API rate limit exceeded")]
  RateLimitExceeded,

  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("invalid base URL '{url}': {source}")]
  BaseUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },

  #[error("request to {url} failed: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("unexpected HTTP {status} from {url}")]
  Status { url: String, status: u16 },

  #[error("malformed response from {url}: {message}")]
  MalformedResponse { url: String, message: String },
}

impl GitHubError {
  pub fn is_rate_limit(&self) -> bool {
    matches!(self, GitHubError::RateLimitExceeded)
  }

  /// The invalid-repository reason, if this is a recoverable error.
  pub fn as_invalid(&self) -> Option<&InvalidRepository> {
    match self {
      GitHubError::Invalid(reason) => Some(reason),
      _ => None,
    }
  }
}

/// The tip commit of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
  pub sha: String,
  pub committed_at: DateTime<Utc>,
}

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Deserialize)]
pub(crate) struct RepoResponse {
  pub default_branch: String,
}

/// `GET /repos/{owner}/{repo}/commits/{ref}`
#[derive(Debug, Deserialize)]
pub(crate) struct CommitResponse {
  pub sha: String,
  pub commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDetail {
  pub committer: Signature,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Signature {
  pub date: String,
}

/// Parse an ISO-8601 timestamp as returned by GitHub and Launchpad.
///
/// Offsets are honoured; timestamps without one are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
    .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
    .ok()
    .map(|naive| naive.and_utc())
}
