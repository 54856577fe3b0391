//! Launchpad web service payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while talking to Launchpad.
#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

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

  #[error("no snap registered with store name '{0}'")]
  SnapNotFound(String),
}

/// A snap recipe as listed by Launchpad.
///
/// Only the fields the poller reads are modelled; the rest of the entry is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Package {
  /// Launchpad recipe name (not the store name).
  pub name: String,

  /// Name registered in the store. Recipes without one are never built.
  #[serde(default)]
  pub store_name: Option<String>,

  /// Whether Launchpad may upload builds to the store.
  #[serde(default)]
  pub store_upload: bool,

  #[serde(default)]
  pub git_repository_url: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub self_link: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub builds_collection_link: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pending_builds_collection_link: Option<String>,
}

impl Package {
  /// Store name if present, otherwise the recipe name. For display only.
  pub fn display_name(&self) -> &str {
    self.store_name.as_deref().filter(|s| !s.is_empty()).unwrap_or(&self.name)
  }
}

/// One page of a Launchpad collection.
#[derive(Debug, Deserialize)]
pub(crate) struct Collection<T> {
  #[serde(default = "Vec::new")]
  pub entries: Vec<T>,
  #[serde(default)]
  pub next_collection_link: Option<String>,
}

/// A snap build entry.
#[derive(Debug, Deserialize)]
pub(crate) struct BuildEntry {
  pub datecreated: Option<String>,
}
