//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// A channel registered on first run, before any state has been persisted.
#[derive(Debug, Deserialize)]
pub struct SeedChannel {
  pub url: String,
  pub name: String,
  /// One of `video`, `live`, `playlist`, `channel`.
  pub kind: String,
}

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // YouTube Data API
  pub api_base_url: String,
  pub search_max_results: u32,

  // Grid / storage
  pub default_grid_cols: u32,
  pub project_name: String,
  pub snapshot_file: String,
  pub log_file: String,

  // UI
  pub notification_secs: u64,
  pub embed_domain: String,

  pub seed_channels: Vec<SeedChannel>,
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
  use crate::grid::grid_config;
  use crate::reference::ContentKind;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert!(c.api_base_url.starts_with("https://"));
    assert!(c.search_max_results > 0);
  }

  #[test]
  fn default_columns_have_a_preset() {
    assert!(grid_config(constants().default_grid_cols).is_some());
  }

  #[test]
  fn seed_channels_use_known_kinds() {
    for seed in &constants().seed_channels {
      assert!(ContentKind::from_label(&seed.kind).is_some(), "unknown seed kind {}", seed.kind);
    }
  }
}
