//! poller-lib: change detection for snaps built from GitHub repositories.
//!
//! This crate decides, for every snap registered on Launchpad by the build
//! service account, whether its upstream sources changed since the last build:
//! - `github`: repository inspection (URL gate, manifest lookup, commit times)
//! - `snapcraft`: `snapcraft.yaml` parsing and part extraction
//! - `launchpad`: the build registry client
//! - `decide`: the build-need decision rule
//! - `poll`: the run driver that evaluates every snap and triggers builds
//! - `report`: run summary rendering and CSV export
//! - `config`: credentials and endpoints from the environment

pub mod config;
pub mod consts;
pub mod decide;
pub mod github;
pub mod launchpad;
pub mod poll;
pub mod report;
pub mod snapcraft;
