//! In-memory [`Registry`] for evaluator and driver tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Package, Registry, RegistryError};

#[derive(Debug, Default)]
pub struct FakeRegistry {
  pub packages: Vec<Package>,
  pub last_builds: HashMap<String, DateTime<Utc>>,
  pub building: HashSet<String>,
  pub failing_lookups: HashSet<String>,
  /// Build-history lookups that answer only after a short pause.
  pub slow_lookups: HashSet<String>,
  pub triggered: Mutex<Vec<String>>,
  pub lookups: AtomicUsize,
}

impl FakeRegistry {
  pub fn with_packages(packages: Vec<Package>) -> Self {
    Self {
      packages,
      ..Default::default()
    }
  }

  pub fn built_at(mut self, store_name: &str, when: DateTime<Utc>) -> Self {
    self.last_builds.insert(store_name.to_string(), when);
    self
  }

  pub fn lookups(&self) -> usize {
    self.lookups.load(Ordering::SeqCst)
  }

  pub fn triggered(&self) -> Vec<String> {
    self.triggered.lock().unwrap().clone()
  }
}

#[async_trait]
impl Registry for FakeRegistry {
  async fn list_packages(&self) -> Result<Vec<Package>, RegistryError> {
    Ok(self.packages.clone())
  }

  async fn last_build_time(&self, store_name: &str) -> Result<Option<DateTime<Utc>>, RegistryError> {
    self.lookups.fetch_add(1, Ordering::SeqCst);
    if self.slow_lookups.contains(store_name) {
      tokio::time::sleep(Duration::from_millis(250)).await;
    }
    if self.failing_lookups.contains(store_name) {
      return Err(RegistryError::Status {
        url: format!("fake://{store_name}/builds"),
        status: 500,
      });
    }
    Ok(self.last_builds.get(store_name).copied())
  }

  async fn is_building(&self, store_name: &str) -> Result<bool, RegistryError> {
    Ok(self.building.contains(store_name))
  }

  async fn trigger_build(&self, store_name: &str) -> Result<(), RegistryError> {
    self.triggered.lock().unwrap().push(store_name.to_string());
    Ok(())
  }
}

/// An eligible package tracking `https://github.com/acme/<store_name>`.
pub fn package(store_name: &str) -> Package {
  Package {
    name: format!("lp-{store_name}"),
    store_name: Some(store_name.to_string()),
    store_upload: true,
    git_repository_url: Some(format!("https://github.com/acme/{store_name}")),
    ..Default::default()
  }
}
