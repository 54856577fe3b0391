//! `snapcraft.yaml` handling.
//!
//! The manifest can live at one of a few well-known paths inside a
//! repository. Once fetched it is parsed loosely: only `name` and the
//! `source*` keys of each part matter here, and odd shapes elsewhere in the
//! file are tolerated.

use serde_yaml::{Mapping, Value};

use crate::github::{InvalidRepository, is_github_repository_url};

/// Candidate manifest paths, probed in order.
pub const MANIFEST_LOCATIONS: [&str; 4] = [
  "snapcraft.yaml",
  ".snapcraft.yaml",
  "snap/snapcraft.yaml",
  "build-aux/snap/snapcraft.yaml",
];

/// Where the manifest was found inside a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestLocation(&'static str);

impl ManifestLocation {
  /// All candidates in probe order.
  pub fn candidates() -> impl Iterator<Item = ManifestLocation> {
    MANIFEST_LOCATIONS.iter().copied().map(ManifestLocation)
  }

  pub fn as_str(&self) -> &'static str {
    self.0
  }

  /// Path components, for building request URLs.
  pub fn segments(&self) -> impl Iterator<Item = &'static str> {
    self.0.split('/')
  }
}

impl std::fmt::Display for ManifestLocation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.0)
  }
}

/// A source declared by a part of the snap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
  /// Part name as declared under `parts:`.
  pub name: String,
  /// Repository URL with any `.git` suffix removed.
  pub url: String,
  pub branch: Option<String>,
  pub tag: Option<String>,
  pub commit: Option<String>,
}

impl Part {
  /// A part pinned to a tag or commit can never change on its own.
  pub fn is_pinned(&self) -> bool {
    self.tag.as_deref().is_some_and(|t| !t.is_empty()) || self.commit.as_deref().is_some_and(|c| !c.is_empty())
  }
}

/// A parsed `snapcraft.yaml`.
#[derive(Debug, Clone)]
pub struct Manifest {
  root: Mapping,
}

impl Manifest {
  /// Parse manifest bytes. The top level must be a mapping.
  pub fn parse(content: &[u8]) -> Result<Self, InvalidRepository> {
    let value: Value = serde_yaml::from_slice(content).map_err(|e| InvalidRepository::ManifestParse(e.to_string()))?;
    match value {
      Value::Mapping(root) => Ok(Self { root }),
      _ => Err(InvalidRepository::ManifestNotMapping),
    }
  }

  /// The declared snap name, or an empty string when absent or not a string.
  pub fn name(&self) -> &str {
    self.root.get("name").and_then(Value::as_str).unwrap_or_default()
  }

  /// Check the declared name against the registered store name.
  pub fn verify_name(&self, expected: &str) -> Result<(), InvalidRepository> {
    let declared = self.name();
    if declared != expected {
      return Err(InvalidRepository::NameMismatch {
        declared: declared.to_string(),
        expected: expected.to_string(),
      });
    }
    Ok(())
  }

  /// Parts whose `source` is a GitHub repository, in declaration order.
  pub fn github_parts(&self) -> Vec<Part> {
    let Some(parts) = self.root.get("parts").and_then(Value::as_mapping) else {
      return Vec::new();
    };

    parts
      .iter()
      .filter_map(|(name, body)| {
        let body = body.as_mapping()?;
        let source = str_field(body, "source")?;
        if !is_github_repository_url(source) {
          return None;
        }
        Some(Part {
          name: yaml_key(name),
          url: source.strip_suffix(".git").unwrap_or(source).to_string(),
          branch: scalar_field(body, "source-branch"),
          tag: scalar_field(body, "source-tag"),
          commit: scalar_field(body, "source-commit"),
        })
      })
      .collect()
  }
}

fn str_field<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
  map.get(key).and_then(Value::as_str)
}

/// Unquoted `1.0` or `20240101` load as numbers; refs are read as text.
fn scalar_field(map: &Mapping, key: &str) -> Option<String> {
  match map.get(key)? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn yaml_key(key: &Value) -> String {
  match key {
    Value::String(s) => s.clone(),
    other => serde_yaml::to_string(other)
      .map(|s| s.trim().to_string())
      .unwrap_or_default(),
  }
}
