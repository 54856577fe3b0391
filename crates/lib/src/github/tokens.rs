//! Round-robin rotation over GitHub access tokens.
//!
//! Each token has its own rate-limit bucket, so every outbound REST request
//! takes the next token in turn. The cursor is an atomic counter and the ring
//! can be shared freely between concurrent evaluations.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixed set of access tokens handed out one per request.
pub struct TokenRing {
  tokens: Vec<String>,
  cursor: AtomicUsize,
}

impl TokenRing {
  pub fn new(tokens: Vec<String>) -> Self {
    Self {
      tokens,
      cursor: AtomicUsize::new(0),
    }
  }

  /// Build a ring from a whitespace-separated list.
  pub fn from_whitespace(list: &str) -> Self {
    Self::new(list.split_whitespace().map(str::to_string).collect())
  }

  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  /// Take the next token, advancing the cursor. `None` if the ring is empty.
  pub fn next_token(&self) -> Option<&str> {
    if self.tokens.is_empty() {
      return None;
    }
    let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.tokens.len();
    Some(&self.tokens[index])
  }
}

// Tokens are secrets; never print them.
impl fmt::Debug for TokenRing {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokenRing")
      .field("tokens", &self.tokens.len())
      .field("cursor", &self.cursor.load(Ordering::Relaxed))
      .finish()
  }
}
