//! Launchpad web service client.
//!
//! Requests are signed with OAuth 1.0 PLAINTEXT, which is what Launchpad
//! expects from long-lived desktop/service integrations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::form_urlencoded;

use super::Registry;
use super::types::{BuildEntry, Collection, Package, RegistryError};
use crate::consts::{APP_NAME, DEFAULT_REQUEST_TIMEOUT_SECS, LAUNCHPAD_API_URL, LAUNCHPAD_OWNER};
use crate::github::parse_timestamp;

/// OAuth credentials for Launchpad.
#[derive(Clone, PartialEq, Eq)]
pub struct LaunchpadCredentials {
  pub consumer_key: String,
  pub token: String,
  pub token_secret: String,
}

impl std::fmt::Debug for LaunchpadCredentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LaunchpadCredentials")
      .field("consumer_key", &self.consumer_key)
      .finish_non_exhaustive()
  }
}

/// Connection settings for [`Launchpad`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchpadSettings {
  /// Web service root, e.g. `https://api.launchpad.net/devel`.
  pub api_url: String,
  /// Account owning the snaps (without the leading `~`).
  pub owner: String,
  pub timeout: Duration,
}

impl Default for LaunchpadSettings {
  fn default() -> Self {
    Self {
      api_url: LAUNCHPAD_API_URL.to_string(),
      owner: LAUNCHPAD_OWNER.to_string(),
      timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
    }
  }
}

/// Launchpad-backed [`Registry`].
#[derive(Debug)]
pub struct Launchpad {
  http: reqwest::Client,
  api_url: String,
  owner: String,
  credentials: LaunchpadCredentials,
  nonce: AtomicU64,
}

impl Launchpad {
  pub fn new(credentials: LaunchpadCredentials, settings: &LaunchpadSettings) -> Result<Self, RegistryError> {
    let http = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(RegistryError::Client)?;

    Ok(Self {
      http,
      api_url: settings.api_url.trim_end_matches('/').to_string(),
      owner: settings.owner.clone(),
      credentials,
      nonce: AtomicU64::new(0),
    })
  }

  fn owner_link(&self) -> String {
    format!("/~{}", self.owner)
  }

  fn authorization(&self) -> String {
    let now = Utc::now();
    let nonce = format!(
      "{}{}",
      now.timestamp_subsec_nanos(),
      self.nonce.fetch_add(1, Ordering::Relaxed)
    );
    let signature = format!("&{}", encode(&self.credentials.token_secret));
    format!(
      "OAuth realm=\"https://api.launchpad.net/\", oauth_consumer_key=\"{}\", oauth_token=\"{}\", \
       oauth_signature_method=\"PLAINTEXT\", oauth_signature=\"{}\", oauth_timestamp=\"{}\", \
       oauth_nonce=\"{}\", oauth_version=\"1.0\"",
      encode(&self.credentials.consumer_key),
      encode(&self.credentials.token),
      encode(&signature),
      now.timestamp(),
      nonce
    )
  }

  fn signed(&self, request: RequestBuilder) -> RequestBuilder {
    request
      .header(ACCEPT, "application/json")
      .header(USER_AGENT, APP_NAME)
      .header(AUTHORIZATION, self.authorization())
  }

  async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, RegistryError> {
    debug!(url, "launchpad request");
    let response = request.send().await.map_err(|source| RegistryError::Request {
      url: url.to_string(),
      source,
    })?;

    let status = response.status();
    if !status.is_success() {
      return Err(RegistryError::Status {
        url: url.to_string(),
        status: status.as_u16(),
      });
    }
    Ok(response)
  }

  async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, RegistryError> {
    let request = self.signed(self.http.get(url).query(query));
    let response = self.send(request, url).await?;
    response.json::<T>().await.map_err(|e| RegistryError::MalformedResponse {
      url: url.to_string(),
      message: e.to_string(),
    })
  }

  /// Look up a snap recipe by its store name.
  pub async fn find_snap(&self, store_name: &str) -> Result<Option<Package>, RegistryError> {
    let url = format!("{}/+snaps", self.api_url);
    let owner = self.owner_link();
    let page: Collection<Package> = self
      .get_json(
        &url,
        &[("ws.op", "findByStoreName"), ("owner", owner.as_str()), ("store_name", store_name)],
      )
      .await?;
    Ok(page.entries.into_iter().next())
  }

  async fn require_snap(&self, store_name: &str) -> Result<Package, RegistryError> {
    self
      .find_snap(store_name)
      .await?
      .ok_or_else(|| RegistryError::SnapNotFound(store_name.to_string()))
  }
}

#[async_trait]
impl Registry for Launchpad {
  async fn list_packages(&self) -> Result<Vec<Package>, RegistryError> {
    let url = format!("{}/+snaps", self.api_url);
    let owner = self.owner_link();

    let mut page_number = 1;
    debug!(page = page_number, "listing snaps");
    let mut page: Collection<Package> = self
      .get_json(&url, &[("ws.op", "findByOwner"), ("owner", owner.as_str())])
      .await?;
    let mut packages = std::mem::take(&mut page.entries);

    while let Some(next) = page.next_collection_link.take() {
      page_number += 1;
      debug!(page = page_number, "listing snaps");
      page = self.get_json(&next, &[]).await?;
      packages.append(&mut page.entries);
    }

    info!(count = packages.len(), pages = page_number, "listed snaps");
    Ok(packages)
  }

  async fn last_build_time(&self, store_name: &str) -> Result<Option<DateTime<Utc>>, RegistryError> {
    let Some(snap) = self.find_snap(store_name).await? else {
      return Ok(None);
    };
    let Some(builds_url) = snap.builds_collection_link else {
      return Ok(None);
    };

    let page: Collection<BuildEntry> = self.get_json(&builds_url, &[("ws.size", "1")]).await?;
    let Some(raw) = page.entries.into_iter().next().and_then(|b| b.datecreated) else {
      return Ok(None);
    };

    let created = parse_timestamp(&raw).ok_or_else(|| RegistryError::MalformedResponse {
      url: builds_url.clone(),
      message: format!("unparseable datecreated '{}'", raw),
    })?;
    debug!(snap = store_name, last_build = %created, "found last build");
    Ok(Some(created))
  }

  async fn is_building(&self, store_name: &str) -> Result<bool, RegistryError> {
    let snap = self.require_snap(store_name).await?;
    let Some(pending_url) = snap.pending_builds_collection_link else {
      return Ok(false);
    };
    let page: Collection<BuildEntry> = self.get_json(&pending_url, &[("ws.size", "1")]).await?;
    Ok(!page.entries.is_empty())
  }

  async fn trigger_build(&self, store_name: &str) -> Result<(), RegistryError> {
    let snap = self.require_snap(store_name).await?;
    let self_link = snap.self_link.ok_or_else(|| RegistryError::MalformedResponse {
      url: format!("{}/+snaps", self.api_url),
      message: format!("snap '{}' has no self_link", store_name),
    })?;

    let request = self.signed(self.http.post(&self_link).form(&[("ws.op", "requestAutoBuilds")]));
    self.send(request, &self_link).await?;
    info!(snap = store_name, "requested builds");
    Ok(())
  }
}

fn encode(value: &str) -> String {
  form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
