//! HTTP transport for the GitHub REST API and raw-content mirror.
//!
//! REST requests are authenticated with the next token from a [`TokenRing`];
//! raw-content requests are anonymous. Every response is checked for an
//! exhausted rate limit before anything else looks at it. Once exhaustion is
//! seen the client refuses to issue further requests for the rest of its life.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use super::tokens::TokenRing;
use super::types::GitHubError;
use crate::consts::{APP_NAME, DEFAULT_REQUEST_TIMEOUT_SECS, GITHUB_API_URL, GITHUB_RAW_URL};

/// Header carrying the number of requests left in the current window.
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Connection settings for [`GitHubClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
  pub api_url: String,
  pub raw_url: String,
  pub timeout: Duration,
}

impl Default for GitHubSettings {
  fn default() -> Self {
    Self {
      api_url: GITHUB_API_URL.to_string(),
      raw_url: GITHUB_RAW_URL.to_string(),
      timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
    }
  }
}

/// Shared GitHub transport.
#[derive(Debug)]
pub struct GitHubClient {
  http: reqwest::Client,
  api_url: Url,
  raw_url: Url,
  tokens: TokenRing,
  exhausted: AtomicBool,
}

impl GitHubClient {
  pub fn new(tokens: TokenRing, settings: &GitHubSettings) -> Result<Self, GitHubError> {
    let http = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(GitHubError::Client)?;

    Ok(Self {
      http,
      api_url: base_url(&settings.api_url)?,
      raw_url: base_url(&settings.raw_url)?,
      tokens,
      exhausted: AtomicBool::new(false),
    })
  }

  /// Whether a previous response reported an exhausted rate limit.
  pub fn is_exhausted(&self) -> bool {
    self.exhausted.load(Ordering::Acquire)
  }

  /// Authenticated `GET {api}/{segments..}`. The caller interprets the status.
  ///
  /// Each segment is percent-encoded on its own, so a `/` or `#` inside a
  /// branch name stays part of that segment.
  pub async fn api_get(&self, segments: &[&str]) -> Result<(String, Response), GitHubError> {
    let url = join(&self.api_url, segments);
    let mut request = self.http.get(&url).header(ACCEPT, "application/json").header(USER_AGENT, APP_NAME);
    if let Some(token) = self.tokens.next_token() {
      request = request.header(AUTHORIZATION, format!("token {}", token));
    }
    let response = self.send(request, &url).await?;
    Ok((url, response))
  }

  /// Anonymous `GET {raw}/{segments..}`. The caller interprets the status.
  pub async fn raw_get(&self, segments: &[&str]) -> Result<(String, Response), GitHubError> {
    let url = join(&self.raw_url, segments);
    let request = self.http.get(&url).header(USER_AGENT, APP_NAME);
    let response = self.send(request, &url).await?;
    Ok((url, response))
  }

  async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, GitHubError> {
    if self.is_exhausted() {
      return Err(GitHubError::RateLimitExceeded);
    }

    debug!(url, "GET");
    let response = request.send().await.map_err(|source| GitHubError::Request {
      url: url.to_string(),
      source,
    })?;

    if rate_limit_exhausted(response.headers()) {
      self.exhausted.store(true, Ordering::Release);
      error!(url, status = response.status().as_u16(), "GitHub rate limit exhausted");
      return Err(GitHubError::RateLimitExceeded);
    }

    Ok(response)
  }
}

fn base_url(raw: &str) -> Result<Url, GitHubError> {
  let url = Url::parse(raw).map_err(|source| GitHubError::BaseUrl {
    url: raw.to_string(),
    source,
  })?;
  if url.cannot_be_a_base() {
    return Err(GitHubError::BaseUrl {
      url: raw.to_string(),
      source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
    });
  }
  Ok(url)
}

fn join(base: &Url, segments: &[&str]) -> String {
  let mut url = base.clone();
  if let Ok(mut path) = url.path_segments_mut() {
    path.pop_if_empty().extend(segments);
  }
  url.into()
}

/// Decode a successful JSON response, or turn any other status into an error.
pub(crate) async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, GitHubError> {
  let status = response.status();
  if !status.is_success() {
    return Err(status_error(url, status));
  }
  response.json::<T>().await.map_err(|e| GitHubError::MalformedResponse {
    url: url.to_string(),
    message: e.to_string(),
  })
}

/// 404 and 403 both mean "not there for us": GitHub answers 403 for private
/// repositories the token cannot see.
pub(crate) fn is_missing(status: StatusCode) -> bool {
  status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN
}

pub(crate) fn status_error(url: &str, status: StatusCode) -> GitHubError {
  GitHubError::Status {
    url: url.to_string(),
    status: status.as_u16(),
  }
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
  headers
    .get(RATE_LIMIT_REMAINING)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim().parse::<u64>().ok())
    == Some(0)
}
