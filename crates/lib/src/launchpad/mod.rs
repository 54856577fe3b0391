//! The build registry: Launchpad snap recipes and their builds.
//!
//! [`Registry`] is the seam between the poller and the registry service;
//! [`Launchpad`] is the production implementation.

mod client;
#[cfg(test)]
pub(crate) mod testing;
mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use client::{Launchpad, LaunchpadCredentials, LaunchpadSettings};
pub use types::{Package, RegistryError};

/// Operations the poller needs from the build registry.
#[async_trait]
pub trait Registry: Send + Sync {
  /// Every snap owned by the build account, following pagination.
  async fn list_packages(&self) -> Result<Vec<Package>, RegistryError>;

  /// Creation time of the most recent build, `None` if never built.
  async fn last_build_time(&self, store_name: &str) -> Result<Option<DateTime<Utc>>, RegistryError>;

  /// Whether a build is queued or running.
  async fn is_building(&self, store_name: &str) -> Result<bool, RegistryError>;

  /// Request new builds.
  async fn trigger_build(&self, store_name: &str) -> Result<(), RegistryError>;
}
