//! End-to-end runs against mocked GitHub and Launchpad services.

use std::time::Duration;

use chrono::{DateTime, Utc};
use mockito::{Matcher, Mock, Server, ServerGuard};
use poller_lib::github::{GitHubClient, GitHubSettings, Inspector, TokenRing};
use poller_lib::launchpad::{Launchpad, LaunchpadCredentials, LaunchpadSettings};
use poller_lib::poll::{Outcome, PollError, PollOptions, Poller};

struct Services {
  github: ServerGuard,
  launchpad: ServerGuard,
  // Dropping a mock unregisters it.
  _mocks: Vec<Mock>,
}

impl Services {
  async fn new() -> Self {
    Self {
      github: Server::new_async().await,
      launchpad: Server::new_async().await,
      _mocks: Vec::new(),
    }
  }

  fn inspector(&self) -> Inspector {
    let settings = GitHubSettings {
      api_url: self.github.url(),
      raw_url: self.github.url(),
      timeout: Duration::from_secs(5),
    };
    Inspector::new(GitHubClient::new(TokenRing::from_whitespace("t1 t2"), &settings).unwrap())
  }

  fn launchpad(&self) -> Launchpad {
    let settings = LaunchpadSettings {
      api_url: self.launchpad.url(),
      owner: "build.snapcraft.io".to_string(),
      timeout: Duration::from_secs(5),
    };
    let credentials = LaunchpadCredentials {
      consumer_key: "snap-poller".to_string(),
      token: "token".to_string(),
      token_secret: "secret".to_string(),
    };
    Launchpad::new(credentials, &settings).unwrap()
  }

  fn snap_json(&self, store_name: &str, repository: &str) -> String {
    format!(
      r#"{{"name": "lp-{store_name}", "store_name": "{store_name}", "store_upload": true,
          "git_repository_url": "{repository}",
          "self_link": "{url}/~build.snapcraft.io/+snap/lp-{store_name}",
          "builds_collection_link": "{url}/~build.snapcraft.io/+snap/lp-{store_name}/builds",
          "pending_builds_collection_link": "{url}/~build.snapcraft.io/+snap/lp-{store_name}/pending_builds"}}"#,
      url = self.launchpad.url()
    )
  }

  async fn registry_lists(&mut self, snaps: &[(&str, &str)]) {
    let entries: Vec<String> = snaps.iter().map(|(name, repo)| self.snap_json(name, repo)).collect();
    let mock = self
      .launchpad
      .mock("GET", "/+snaps")
      .match_query(Matcher::UrlEncoded("ws.op".into(), "findByOwner".into()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(format!(r#"{{"entries": [{}]}}"#, entries.join(",")))
      .create_async()
      .await;
    self._mocks.push(mock);
  }

  /// Registry lookups for a snap last built at `last_build` with nothing pending.
  async fn registry_knows(&mut self, store_name: &str, repository: &str, last_build: DateTime<Utc>) {
    let entry = self.snap_json(store_name, repository);
    let find = self
      .launchpad
      .mock("GET", "/+snaps")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("ws.op".into(), "findByStoreName".into()),
        Matcher::UrlEncoded("store_name".into(), store_name.into()),
      ]))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(format!(r#"{{"entries": [{entry}]}}"#))
      .create_async()
      .await;
    let builds = self
      .launchpad
      .mock("GET", format!("/~build.snapcraft.io/+snap/lp-{store_name}/builds").as_str())
      .match_query(Matcher::Any)
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(format!(r#"{{"entries": [{{"datecreated": "{}"}}]}}"#, last_build.to_rfc3339()))
      .create_async()
      .await;
    let pending = self
      .launchpad
      .mock("GET", format!("/~build.snapcraft.io/+snap/lp-{store_name}/pending_builds").as_str())
      .match_query(Matcher::Any)
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"entries": []}"#)
      .create_async()
      .await;
    self._mocks.extend([find, builds, pending]);
  }

  async fn expect_trigger(&mut self, store_name: &str, hits: usize) -> Mock {
    self
      .launchpad
      .mock("POST", format!("/~build.snapcraft.io/+snap/lp-{store_name}").as_str())
      .match_body(Matcher::UrlEncoded("ws.op".into(), "requestAutoBuilds".into()))
      .with_status(200)
      .with_body("[]")
      .expect(hits)
      .create_async()
      .await
  }

  /// `acme/<name>` on GitHub with a root manifest and tip commit at `tip`.
  async fn github_repo(&mut self, name: &str, tip: DateTime<Utc>, manifest: &str) {
    let repo = self
      .github
      .mock("GET", format!("/repos/acme/{name}").as_str())
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"default_branch": "main"}"#)
      .create_async()
      .await;
    let commit = self
      .github
      .mock("GET", format!("/repos/acme/{name}/commits/main").as_str())
      .match_header("authorization", Matcher::Regex("^token t[12]$".to_string()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(format!(
        r#"{{"sha": "{name}-tip", "commit": {{"committer": {{"date": "{}"}}}}}}"#,
        tip.to_rfc3339()
      ))
      .create_async()
      .await;
    let contents = self
      .github
      .mock("GET", format!("/repos/acme/{name}/contents/snapcraft.yaml").as_str())
      .with_status(200)
      .with_body("{}")
      .create_async()
      .await;
    let raw = self
      .github
      .mock("GET", format!("/acme/{name}/{name}-tip/snapcraft.yaml").as_str())
      .with_status(200)
      .with_body(manifest.to_string())
      .create_async()
      .await;
    self._mocks.extend([repo, commit, contents, raw]);
  }
}

fn days_ago(days: i64) -> DateTime<Utc> {
  Utc::now() - chrono::Duration::days(days)
}

#[tokio::test]
async fn rebuilds_changed_snaps_only() {
  let mut services = Services::new().await;
  services
    .registry_lists(&[
      ("foo", "https://github.com/acme/foo"),
      ("quiet", "https://github.com/acme/quiet"),
      ("elsewhere", "https://git.launchpad.net/elsewhere"),
    ])
    .await;
  services.registry_knows("foo", "https://github.com/acme/foo", days_ago(3)).await;
  services.registry_knows("quiet", "https://github.com/acme/quiet", days_ago(3)).await;
  services.github_repo("foo", days_ago(1), "name: foo\n").await;
  services.github_repo("quiet", days_ago(5), "name: quiet\n").await;
  let foo_trigger = services.expect_trigger("foo", 1).await;
  let quiet_trigger = services.expect_trigger("quiet", 0).await;

  let inspector = services.inspector();
  let launchpad = services.launchpad();
  let summary = Poller::new(&inspector, &launchpad, PollOptions::default()).run().await.unwrap();

  assert_eq!((summary.total, summary.built, summary.skipped, summary.errored), (3, 1, 2, 0));
  let outcomes: Vec<_> = summary.records.iter().map(|r| (r.name.as_str(), r.outcome)).collect();
  assert_eq!(
    outcomes,
    [
      ("lp-foo", Outcome::Built),
      ("lp-quiet", Outcome::Skipped),
      ("lp-elsewhere", Outcome::Skipped),
    ]
  );
  assert_eq!(summary.records[2].reason, "not using GitHub");

  foo_trigger.assert_async().await;
  quiet_trigger.assert_async().await;
}

#[tokio::test]
async fn dry_run_issues_no_post() {
  let mut services = Services::new().await;
  services.registry_lists(&[("foo", "https://github.com/acme/foo")]).await;
  services.registry_knows("foo", "https://github.com/acme/foo", days_ago(3)).await;
  services.github_repo("foo", days_ago(1), "name: foo\n").await;
  let trigger = services.expect_trigger("foo", 0).await;

  let inspector = services.inspector();
  let launchpad = services.launchpad();
  let options = PollOptions {
    dry_run: true,
    ..Default::default()
  };
  let summary = Poller::new(&inspector, &launchpad, options).run().await.unwrap();

  assert_eq!(summary.would_build, 1);
  trigger.assert_async().await;
}

#[tokio::test]
async fn rate_limit_aborts_before_later_snaps() {
  let mut services = Services::new().await;
  services
    .registry_lists(&[
      ("foo", "https://github.com/acme/foo"),
      ("bar", "https://github.com/acme/bar"),
    ])
    .await;
  let limited = services
    .github
    .mock("GET", Matcher::Any)
    .with_status(403)
    .with_header("x-ratelimit-remaining", "0")
    .expect(1)
    .create_async()
    .await;

  let inspector = services.inspector();
  let launchpad = services.launchpad();
  let err = Poller::new(&inspector, &launchpad, PollOptions::default()).run().await.unwrap_err();

  assert!(matches!(err, PollError::RateLimited { ref summary } if summary.checked() == 0 && summary.total == 2));
  assert!(inspector.client().is_exhausted());
  limited.assert_async().await;
}
