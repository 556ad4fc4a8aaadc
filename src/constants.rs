//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub default_api_url: String,
  pub admin_key_header: String,

  // Catalog fetching
  pub debounce_ms: u64,
  pub http_timeout_secs: u64,

  // Status bar
  pub error_dismiss_secs: u64,

  // Admin
  pub batch_soft_limit: usize,
  pub default_wpm: u32,
  pub cefr_levels: Vec<String>,
}

impl Constants {
  /// Quiet period between the last filter edit and the listing fetch.
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.debounce(), Duration::from_millis(500));
    assert_eq!(c.admin_key_header, "x-admin-key");
    assert_eq!(c.cefr_levels.len(), 6);
  }
}
