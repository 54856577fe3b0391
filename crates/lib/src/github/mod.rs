//! GitHub access for change detection.
//!
//! # Modules
//!
//! - [`url`] - strict `https://github.com/<owner>/<repo>` parsing
//! - [`tokens`] - round-robin access token rotation
//! - [`client`] - HTTP transport with rate-limit detection
//! - [`inspect`] - repository queries used by the decision rule
//! - [`types`] - errors, API payloads and [`Commit`]

pub mod client;
pub mod inspect;
pub mod tokens;
mod types;
pub mod url;

pub use client::{GitHubClient, GitHubSettings};
pub use inspect::Inspector;
pub use tokens::TokenRing;
pub use types::*;
pub use url::{RepoUrlError, RepositoryRef, is_github_repository_url};
