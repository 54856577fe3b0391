//! Environment configuration.
//!
//! Credentials and service endpoints come from the environment; per-run
//! options (threshold, jobs, dry run) come from the command line.

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::consts::{
  APP_NAME, DEFAULT_REQUEST_TIMEOUT_SECS, GITHUB_API_URL, GITHUB_RAW_URL, LAUNCHPAD_API_URL, LAUNCHPAD_OWNER,
};
use crate::github::{GitHubSettings, TokenRing};
use crate::launchpad::{LaunchpadCredentials, LaunchpadSettings};

pub const GITHUB_TOKENS_VAR: &str = "GITHUB_SNAPCRAFT_POLLER_TOKENS";
pub const LP_TOKEN_VAR: &str = "LP_API_TOKEN";
pub const LP_TOKEN_SECRET_VAR: &str = "LP_API_TOKEN_SECRET";
pub const LP_CONSUMER_KEY_VAR: &str = "LP_CONSUMER_KEY";
pub const GITHUB_API_URL_VAR: &str = "POLLER_GITHUB_API_URL";
pub const GITHUB_RAW_URL_VAR: &str = "POLLER_GITHUB_RAW_URL";
pub const LAUNCHPAD_URL_VAR: &str = "POLLER_LAUNCHPAD_URL";
pub const LAUNCHPAD_OWNER_VAR: &str = "POLLER_LAUNCHPAD_OWNER";
pub const REQUEST_TIMEOUT_VAR: &str = "POLLER_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("environment variable {0} is not set")]
  Missing(&'static str),

  #[error("environment variable {name} is invalid: {message}")]
  Invalid { name: &'static str, message: String },
}

/// Everything the poller reads from the environment.
#[derive(Debug)]
pub struct PollerConfig {
  pub tokens: TokenRing,
  pub credentials: LaunchpadCredentials,
  pub github: GitHubSettings,
  pub launchpad: LaunchpadSettings,
}

impl PollerConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let tokens = TokenRing::from_whitespace(&required(GITHUB_TOKENS_VAR)?);

    let credentials = LaunchpadCredentials {
      consumer_key: optional(LP_CONSUMER_KEY_VAR).unwrap_or_else(|| APP_NAME.to_string()),
      token: required(LP_TOKEN_VAR)?,
      token_secret: required(LP_TOKEN_SECRET_VAR)?,
    };

    let timeout = match optional(REQUEST_TIMEOUT_VAR) {
      Some(raw) => parse_timeout(&raw)?,
      None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
    };

    let github = GitHubSettings {
      api_url: url_var(GITHUB_API_URL_VAR, GITHUB_API_URL)?,
      raw_url: url_var(GITHUB_RAW_URL_VAR, GITHUB_RAW_URL)?,
      timeout,
    };
    let launchpad = LaunchpadSettings {
      api_url: url_var(LAUNCHPAD_URL_VAR, LAUNCHPAD_API_URL)?,
      owner: optional(LAUNCHPAD_OWNER_VAR).unwrap_or_else(|| LAUNCHPAD_OWNER.to_string()),
      timeout,
    };

    debug!(
      tokens = tokens.len(),
      github = %github.api_url,
      launchpad = %launchpad.api_url,
      owner = %launchpad.owner,
      "loaded configuration"
    );

    Ok(Self {
      tokens,
      credentials,
      github,
      launchpad,
    })
  }
}

/// Set and non-blank, trimmed.
fn optional(name: &'static str) -> Option<String> {
  env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
  optional(name).ok_or(ConfigError::Missing(name))
}

fn url_var(name: &'static str, default: &str) -> Result<String, ConfigError> {
  let Some(raw) = optional(name) else {
    return Ok(default.to_string());
  };
  url::Url::parse(&raw).map_err(|e| ConfigError::Invalid {
    name,
    message: e.to_string(),
  })?;
  Ok(raw.trim_end_matches('/').to_string())
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
  match raw.parse::<u64>() {
    Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
    _ => Err(ConfigError::Invalid {
      name: REQUEST_TIMEOUT_VAR,
      message: format!("expected a positive number of seconds, got '{raw}'"),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const ALL_VARS: [&str; 9] = [
    GITHUB_TOKENS_VAR,
    LP_TOKEN_VAR,
    LP_TOKEN_SECRET_VAR,
    LP_CONSUMER_KEY_VAR,
    GITHUB_API_URL_VAR,
    GITHUB_RAW_URL_VAR,
    LAUNCHPAD_URL_VAR,
    LAUNCHPAD_OWNER_VAR,
    REQUEST_TIMEOUT_VAR,
  ];

  /// Run `f` with only the given variables set.
  fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let pairs: Vec<(&str, Option<&str>)> = ALL_VARS
      .iter()
      .map(|name| (*name, vars.iter().find(|(k, _)| k == name).map(|(_, v)| *v)))
      .collect();
    temp_env::with_vars(pairs, f)
  }

  const MINIMAL: [(&str, &str); 3] = [
    (GITHUB_TOKENS_VAR, "t1 t2\nt3"),
    (LP_TOKEN_VAR, "lp-token"),
    (LP_TOKEN_SECRET_VAR, "lp-secret"),
  ];

  mod defaults {
    use super::*;

    #[test]
    #[serial]
    fn minimal_environment() {
      let config = with_env(&MINIMAL, PollerConfig::from_env).unwrap();
      assert_eq!(config.tokens.len(), 3);
      assert_eq!(config.credentials.consumer_key, "snap-poller");
      assert_eq!(config.github.api_url, GITHUB_API_URL);
      assert_eq!(config.github.raw_url, GITHUB_RAW_URL);
      assert_eq!(config.launchpad.api_url, LAUNCHPAD_API_URL);
      assert_eq!(config.launchpad.owner, "build.snapcraft.io");
      assert_eq!(config.github.timeout, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn overrides() {
      let mut vars = MINIMAL.to_vec();
      vars.extend([
        (LP_CONSUMER_KEY_VAR, "my-poller"),
        (GITHUB_API_URL_VAR, "http://127.0.0.1:9000/"),
        (LAUNCHPAD_OWNER_VAR, "someone"),
        (REQUEST_TIMEOUT_VAR, "5"),
      ]);
      let config = with_env(&vars, PollerConfig::from_env).unwrap();
      assert_eq!(config.credentials.consumer_key, "my-poller");
      assert_eq!(config.github.api_url, "http://127.0.0.1:9000");
      assert_eq!(config.launchpad.owner, "someone");
      assert_eq!(config.launchpad.timeout, Duration::from_secs(5));
    }
  }

  mod errors {
    use super::*;

    #[test]
    #[serial]
    fn missing_tokens() {
      let err = with_env(&MINIMAL[1..], PollerConfig::from_env).unwrap_err();
      assert_eq!(err, ConfigError::Missing(GITHUB_TOKENS_VAR));
    }

    #[test]
    #[serial]
    fn blank_tokens() {
      let mut vars = MINIMAL.to_vec();
      vars[0] = (GITHUB_TOKENS_VAR, "   \n ");
      let err = with_env(&vars, PollerConfig::from_env).unwrap_err();
      assert_eq!(err, ConfigError::Missing(GITHUB_TOKENS_VAR));
    }

    #[test]
    #[serial]
    fn missing_launchpad_secret() {
      let err = with_env(&MINIMAL[..2], PollerConfig::from_env).unwrap_err();
      assert_eq!(err, ConfigError::Missing(LP_TOKEN_SECRET_VAR));
    }

    #[test]
    #[serial]
    fn invalid_timeout() {
      for bad in ["0", "soon", "-3"] {
        let mut vars = MINIMAL.to_vec();
        vars.push((REQUEST_TIMEOUT_VAR, bad));
        let err = with_env(&vars, PollerConfig::from_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name, .. } if name == REQUEST_TIMEOUT_VAR));
      }
    }

    #[test]
    #[serial]
    fn invalid_url() {
      let mut vars = MINIMAL.to_vec();
      vars.push((LAUNCHPAD_URL_VAR, "not a url"));
      let err = with_env(&vars, PollerConfig::from_env).unwrap_err();
      assert!(matches!(err, ConfigError::Invalid { name, .. } if name == LAUNCHPAD_URL_VAR));
    }
  }
}
