//! Repository inspection: everything the decision rule needs to know about a
//! GitHub repository.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::debug;

use super::client::{GitHubClient, is_missing, read_json, status_error};
use super::types::{Commit, CommitResponse, GitHubError, InvalidRepository, RepoResponse, parse_timestamp};
use super::url::RepositoryRef;
use crate::snapcraft::{Manifest, ManifestLocation, Part};

/// Read-only queries against GitHub repositories.
#[derive(Debug)]
pub struct Inspector {
  client: GitHubClient,
}

impl Inspector {
  pub fn new(client: GitHubClient) -> Self {
    Self { client }
  }

  pub fn client(&self) -> &GitHubClient {
    &self.client
  }

  /// Name of the repository's default branch.
  pub async fn default_branch(&self, repo: &RepositoryRef) -> Result<String, GitHubError> {
    let (url, response) = self.client.api_get(&["repos", repo.owner.as_str(), repo.repo.as_str()]).await?;
    if is_missing(response.status()) {
      return Err(InvalidRepository::NotFound.into());
    }
    let body: RepoResponse = read_json(&url, response).await?;
    Ok(body.default_branch)
  }

  /// Find the first manifest candidate present on the default branch.
  ///
  /// A missing candidate moves on to the next one; any other failure status
  /// is reported as is.
  pub async fn manifest_location(&self, repo: &RepositoryRef) -> Result<ManifestLocation, GitHubError> {
    for location in ManifestLocation::candidates() {
      let mut path = vec!["repos", repo.owner.as_str(), repo.repo.as_str(), "contents"];
      for segment in location.segments() {
        path.push(segment);
      }
      let (url, response) = self.client.api_get(&path).await?;

      let status = response.status();
      if status == StatusCode::OK {
        debug!(%repo, %location, "found snapcraft.yaml");
        return Ok(location);
      }
      if !is_missing(status) {
        return Err(status_error(&url, status));
      }
    }

    Err(InvalidRepository::MissingManifest.into())
  }

  /// Tip commit of `branch`, or of the default branch when `None`.
  pub async fn latest_commit(&self, repo: &RepositoryRef, branch: Option<&str>) -> Result<Commit, GitHubError> {
    let branch = match branch {
      Some(branch) => branch.to_string(),
      None => self.default_branch(repo).await?,
    };

    let (url, response) = self
      .client
      .api_get(&["repos", repo.owner.as_str(), repo.repo.as_str(), "commits", branch.as_str()])
      .await?;
    if is_missing(response.status()) {
      return Err(InvalidRepository::BranchNotFound(branch).into());
    }

    let body: CommitResponse = read_json(&url, response).await?;
    let committed_at = parse_timestamp(&body.commit.committer.date).ok_or_else(|| GitHubError::MalformedResponse {
      url: url.clone(),
      message: format!("unparseable committer date '{}'", body.commit.committer.date),
    })?;

    Ok(Commit {
      sha: body.sha,
      committed_at,
    })
  }

  /// Committer timestamp of the tip of `branch` (default branch when `None`).
  pub async fn latest_commit_timestamp(
    &self,
    repo: &RepositoryRef,
    branch: Option<&str>,
  ) -> Result<DateTime<Utc>, GitHubError> {
    Ok(self.latest_commit(repo, branch).await?.committed_at)
  }

  /// Fetch and parse the manifest as of the default branch's tip commit.
  ///
  /// The raw mirror caches by path, so content is requested by commit id
  /// rather than by branch name to avoid stale reads right after a push.
  pub async fn fetch_manifest(&self, repo: &RepositoryRef, location: ManifestLocation) -> Result<Manifest, GitHubError> {
    let tip = self.latest_commit(repo, None).await?;
    let mut path = vec![repo.owner.as_str(), repo.repo.as_str(), tip.sha.as_str()];
    for segment in location.segments() {
      path.push(segment);
    }
    let (url, response) = self.client.raw_get(&path).await?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
      return Err(InvalidRepository::MissingManifest.into());
    }
    if !status.is_success() {
      return Err(status_error(&url, status));
    }

    let content = response.bytes().await.map_err(|source| GitHubError::Request {
      url: url.clone(),
      source,
    })?;
    Ok(Manifest::parse(&content)?)
  }

  /// Check that the manifest declares `expected` as the snap name.
  pub async fn verify_manifest_name(
    &self,
    repo: &RepositoryRef,
    location: ManifestLocation,
    expected: &str,
  ) -> Result<(), GitHubError> {
    let manifest = self.fetch_manifest(repo, location).await?;
    manifest.verify_name(expected)?;
    Ok(())
  }

  /// Parts of the manifest that pull their source from GitHub.
  pub async fn defined_parts(&self, repo: &RepositoryRef, location: ManifestLocation) -> Result<Vec<Part>, GitHubError> {
    let manifest = self.fetch_manifest(repo, location).await?;
    Ok(manifest.github_parts())
  }

  /// True if the tip of `branch` was committed strictly after `since`.
  pub async fn has_changed_since(
    &self,
    repo: &RepositoryRef,
    since: DateTime<Utc>,
    branch: Option<&str>,
  ) -> Result<bool, GitHubError> {
    let committed_at = self.latest_commit_timestamp(repo, branch).await?;
    debug!(%repo, branch = ?branch, %committed_at, %since, "comparing tip commit with last build");
    Ok(committed_at > since)
  }
}

#[cfg(test)]
pub(crate) mod testing {
  //! Mock GitHub responses shared by the inspector and evaluator tests.

  use std::time::Duration;

  use chrono::{DateTime, Utc};
  use mockito::{Mock, Server};

  use super::Inspector;
  use crate::github::{GitHubClient, GitHubSettings, TokenRing};

  pub fn inspector_for(server: &Server) -> Inspector {
    let settings = GitHubSettings {
      api_url: server.url(),
      raw_url: server.url(),
      timeout: Duration::from_secs(5),
    };
    Inspector::new(GitHubClient::new(TokenRing::from_whitespace("t1 t2"), &settings).unwrap())
  }

  pub async fn mock_repo(server: &mut Server, owner: &str, repo: &str, default_branch: &str) -> Mock {
    server
      .mock("GET", format!("/repos/{owner}/{repo}").as_str())
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(format!(r#"{{"default_branch": "{default_branch}"}}"#))
      .create_async()
      .await
  }

  pub async fn mock_commit(
    server: &mut Server,
    owner: &str,
    repo: &str,
    branch: &str,
    sha: &str,
    date: DateTime<Utc>,
  ) -> Mock {
    server
      .mock("GET", format!("/repos/{owner}/{repo}/commits/{branch}").as_str())
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(format!(
        r#"{{"sha": "{sha}", "commit": {{"committer": {{"name": "dev", "date": "{}"}}}}}}"#,
        date.to_rfc3339()
      ))
      .create_async()
      .await
  }

  pub async fn mock_contents(server: &mut Server, owner: &str, repo: &str, path: &str, status: usize) -> Mock {
    server
      .mock("GET", format!("/repos/{owner}/{repo}/contents/{path}").as_str())
      .with_status(status)
      .with_body("{}")
      .create_async()
      .await
  }

  pub async fn mock_raw(server: &mut Server, owner: &str, repo: &str, sha: &str, path: &str, body: &str) -> Mock {
    server
      .mock("GET", format!("/{owner}/{repo}/{sha}/{path}").as_str())
      .with_status(200)
      .with_body(body.to_string())
      .create_async()
      .await
  }

  /// A repository whose default branch is `main` with one commit at `date`.
  pub async fn mock_tip(server: &mut Server, owner: &str, repo: &str, sha: &str, date: DateTime<Utc>) -> (Mock, Mock) {
    let repo_mock = mock_repo(server, owner, repo, "main").await;
    let commit_mock = mock_commit(server, owner, repo, "main", sha, date).await;
    (repo_mock, commit_mock)
  }
}
