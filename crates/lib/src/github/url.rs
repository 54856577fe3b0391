//! GitHub repository URL validation and parsing.
//!
//! Only URLs of the exact shape `https://github.com/<owner>/<repo>` are
//! tracked. Anything else (trailing slashes, sub-paths, other hosts, query
//! strings) is rejected up front rather than sliced apart later.

use std::fmt;

use thiserror::Error;
use url::Url;

use crate::consts::GITHUB_HOST;

/// Reasons a string is not a trackable repository URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoUrlError {
  #[error("not a valid URL: {0}")]
  Parse(String),

  #[error("unsupported scheme '{0}'")]
  Scheme(String),

  #[error("unsupported host '{0}'")]
  Host(String),

  #[error("URL must not carry credentials, a port, a query or a fragment")]
  Extraneous,

  #[error("expected exactly /<owner>/<repo>, got '{0}'")]
  Path(String),

  #[error("'{0}' is not written in canonical form")]
  NotCanonical(String),
}

/// An owner/repository pair on GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
  pub owner: String,
  pub repo: String,
}

impl RepositoryRef {
  pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
    Self {
      owner: owner.into(),
      repo: repo.into(),
    }
  }

  /// Parse `https://github.com/<owner>/<repo>`.
  pub fn parse(raw: &str) -> Result<Self, RepoUrlError> {
    let url = Url::parse(raw).map_err(|e| RepoUrlError::Parse(e.to_string()))?;

    if url.scheme() != "https" {
      return Err(RepoUrlError::Scheme(url.scheme().to_string()));
    }

    match url.host_str() {
      Some(host) if host == GITHUB_HOST => {}
      other => return Err(RepoUrlError::Host(other.unwrap_or_default().to_string())),
    }

    if !url.username().is_empty()
      || url.password().is_some()
      || url.port().is_some()
      || url.query().is_some()
      || url.fragment().is_some()
    {
      return Err(RepoUrlError::Extraneous);
    }

    // The parser resolves dot segments and backslashes; the shape check
    // below must see what was actually written.
    if url.as_str() != raw {
      return Err(RepoUrlError::NotCanonical(raw.to_string()));
    }

    let segments: Vec<&str> = url.path().trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
      [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(Self::new(*owner, *repo)),
      _ => Err(RepoUrlError::Path(url.path().to_string())),
    }
  }

  /// The canonical web URL of this repository.
  pub fn web_url(&self) -> String {
    format!("https://{}/{}/{}", GITHUB_HOST, self.owner, self.repo)
  }
}

impl fmt::Display for RepositoryRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.owner, self.repo)
  }
}

/// Return true if `url` is exactly `https://github.com/<owner>/<repo>`.
pub fn is_github_repository_url(url: &str) -> bool {
  RepositoryRef::parse(url).is_ok()
}
