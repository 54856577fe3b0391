//! The build-need decision rule.
//!
//! A snap is rebuilt only when all of the following hold, checked in order
//! and stopping at the first failure:
//!
//! 1. it has a store name and may upload to the store,
//! 2. it is built from a `https://github.com/<owner>/<repo>` repository,
//! 3. that repository has a `snapcraft.yaml` declaring the same name,
//! 4. it has been built before, and not within the threshold window,
//! 5. the repository, or the branch of one of its GitHub parts, has a commit
//!    newer than the last build.
//!
//! Parts pinned to a tag or commit are never checked. An unusable part is
//! logged and ignored; an unusable primary repository skips the snap.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::github::{GitHubError, Inspector, InvalidRepository, RepositoryRef};
use crate::launchpad::{Package, Registry, RegistryError};
use crate::snapcraft::Part;

/// Why a snap does or does not need building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
  MissingStoreName,
  UploadNotPermitted,
  UnsupportedHost,
  InvalidRepository(InvalidRepository),
  NeverBuilt,
  RecentlyBuilt { last_build: DateTime<Utc> },
  PrimaryChanged,
  PartChanged { url: String },
  Unchanged,
}

impl fmt::Display for Reason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Reason::MissingStoreName => f.write_str("no store name"),
      Reason::UploadNotPermitted => f.write_str("can't be published from Launchpad"),
      Reason::UnsupportedHost => f.write_str("not using GitHub"),
      Reason::InvalidRepository(reason) => write!(f, "{}", reason),
      Reason::NeverBuilt => f.write_str("the snap has never been built"),
      Reason::RecentlyBuilt { last_build } => {
        write!(f, "the snap has been recently built ({})", last_build.to_rfc3339())
      }
      Reason::PrimaryChanged => f.write_str("primary repository changed"),
      Reason::PartChanged { url } => write!(f, "part changed: {}", url),
      Reason::Unchanged => f.write_str("no changes since last build"),
    }
  }
}

/// Outcome of evaluating one snap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
  pub needs_building: bool,
  pub reason: Reason,
}

impl Decision {
  pub fn build(reason: Reason) -> Self {
    Self {
      needs_building: true,
      reason,
    }
  }

  pub fn skip(reason: Reason) -> Self {
    Self {
      needs_building: false,
      reason,
    }
  }
}

impl fmt::Display for Decision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let verdict = if self.needs_building { "build" } else { "skip" };
    write!(f, "{}: {}", verdict, self.reason)
  }
}

/// Failures that stop the evaluation of a snap.
///
/// Invalid repositories are not errors; they produce a skip [`Decision`].
#[derive(Debug, Error)]
pub enum EvaluateError {
  #[error(transparent)]
  GitHub(#[from] GitHubError),

  #[error("registry error: {0}")]
  Registry(#[from] RegistryError),
}

impl EvaluateError {
  /// A rate-limited GitHub is fatal to the whole run.
  pub fn is_rate_limit(&self) -> bool {
    matches!(self, EvaluateError::GitHub(e) if e.is_rate_limit())
  }
}

/// Applies the decision rule to snaps.
pub struct Evaluator<'a> {
  inspector: &'a Inspector,
  registry: &'a dyn Registry,
  threshold: DateTime<Utc>,
}

impl<'a> Evaluator<'a> {
  /// `threshold`: snaps last built after this instant are left alone.
  pub fn new(inspector: &'a Inspector, registry: &'a dyn Registry, threshold: DateTime<Utc>) -> Self {
    Self {
      inspector,
      registry,
      threshold,
    }
  }

  pub fn threshold(&self) -> DateTime<Utc> {
    self.threshold
  }

  pub async fn evaluate(&self, package: &Package) -> Result<Decision, EvaluateError> {
    let Some(store_name) = package.store_name.as_deref().filter(|s| !s.is_empty()) else {
      info!(snap = %package.name, "skipped: no store name");
      return Ok(Decision::skip(Reason::MissingStoreName));
    };

    if !package.store_upload {
      info!(snap = store_name, "skipped: can't be published from Launchpad");
      return Ok(Decision::skip(Reason::UploadNotPermitted));
    }

    let Some(repo) = package
      .git_repository_url
      .as_deref()
      .and_then(|url| RepositoryRef::parse(url).ok())
    else {
      info!(snap = store_name, url = ?package.git_repository_url, "skipped: not using GitHub");
      return Ok(Decision::skip(Reason::UnsupportedHost));
    };

    debug!(snap = store_name, %repo, "verifying snap against GitHub repository");

    let location = match self.inspector.manifest_location(&repo).await {
      Ok(location) => location,
      Err(e) => return invalid_skip(store_name, e),
    };
    if let Err(e) = self.inspector.verify_manifest_name(&repo, location, store_name).await {
      return invalid_skip(store_name, e);
    }

    let Some(last_build) = self.registry.last_build_time(store_name).await? else {
      info!(snap = store_name, "skipped: the snap has never been built");
      return Ok(Decision::skip(Reason::NeverBuilt));
    };

    if last_build > self.threshold {
      info!(snap = store_name, %last_build, "skipped: the snap has been recently built");
      return Ok(Decision::skip(Reason::RecentlyBuilt { last_build }));
    }

    debug!(snap = store_name, "checking if the repository changed since the last build");
    match self.inspector.has_changed_since(&repo, last_build, None).await {
      Ok(true) => {
        debug!(snap = store_name, "repository changed since last build");
        return Ok(Decision::build(Reason::PrimaryChanged));
      }
      Ok(false) => {}
      Err(e) => return invalid_skip(store_name, e),
    }

    debug!(snap = store_name, "getting defined parts");
    let parts = match self.inspector.defined_parts(&repo, location).await {
      Ok(parts) => parts,
      Err(e) => return invalid_skip(store_name, e),
    };

    if let Some(part) = self.first_changed_part(store_name, &parts, last_build).await? {
      info!(snap = store_name, part = %part.name, url = %part.url, "part changed since last build");
      return Ok(Decision::build(Reason::PartChanged { url: part.url.clone() }));
    }

    debug!(snap = store_name, "no changes since last build");
    Ok(Decision::skip(Reason::Unchanged))
  }

  async fn first_changed_part<'p>(
    &self,
    store_name: &str,
    parts: &'p [Part],
    since: DateTime<Utc>,
  ) -> Result<Option<&'p Part>, EvaluateError> {
    for part in parts {
      debug!(snap = store_name, part = %part.name, url = %part.url, "checking part");

      if part.is_pinned() {
        debug!(snap = store_name, part = %part.name, "skipping part pinned to a tag or commit");
        continue;
      }

      let repo = match RepositoryRef::parse(&part.url) {
        Ok(repo) => repo,
        Err(e) => {
          debug!(snap = store_name, part = %part.name, error = %e, "skipping part");
          continue;
        }
      };

      match self.inspector.has_changed_since(&repo, since, part.branch.as_deref()).await {
        Ok(true) => return Ok(Some(part)),
        Ok(false) => {}
        Err(GitHubError::Invalid(reason)) => {
          debug!(snap = store_name, part = %part.name, %reason, "skipping part");
        }
        Err(e) => return Err(e.into()),
      }
    }
    Ok(None)
  }
}

/// Turn an invalid repository into a skip; pass every other error through.
fn invalid_skip(store_name: &str, error: GitHubError) -> Result<Decision, EvaluateError> {
  match error {
    GitHubError::Invalid(reason) => {
      info!(snap = store_name, %reason, "skipped: invalid repository");
      Ok(Decision::skip(Reason::InvalidRepository(reason)))
    }
    other => Err(other.into()),
  }
}
