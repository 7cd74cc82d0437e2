use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::constants;

/// User preferences kept in `prefs.toml`. Dashboard state lives in the
/// snapshot, not here. The API key is never written to disk.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub quality: Option<String>,
  pub channel_list_visible: Option<bool>,
}

impl Config {
  fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", &constants().project_name).map(|dirs| dirs.config_dir().join("prefs.toml"))
  }

  pub fn load() -> Self {
    Self::default_path().map(|path| Self::load_from(&path)).unwrap_or_default()
  }

  pub fn load_from(path: &Path) -> Self {
    if let Ok(content) = std::fs::read_to_string(path) {
      match toml::from_str(&content) {
        Ok(config) => return config,
        Err(e) => warn!(path = %path.display(), err = %e, "config: ignoring unreadable prefs"),
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(path) = Self::default_path() {
      self.save_to(&path);
    }
  }

  pub fn save_to(&self, path: &Path) {
    if let Err(e) = self.write_to(path) {
      warn!(path = %path.display(), err = %format!("{:#}", e), "config: failed to save prefs");
    }
  }

  fn write_to(&self, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("Failed to serialize prefs")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ytgrid-prefs-{}-{}", std::process::id(), tag)).join("prefs.toml")
  }

  #[test]
  fn missing_file_gives_defaults() {
    assert_eq!(Config::load_from(&temp_path("missing")), Config::default());
  }

  #[test]
  fn save_then_load() {
    let path = temp_path("roundtrip");
    let config =
      Config { theme_name: Some("Nord".into()), quality: Some("hd720".into()), channel_list_visible: Some(false) };
    config.save_to(&path);
    assert_eq!(Config::load_from(&path), config);
  }

  #[test]
  fn unwritable_location_is_an_error() {
    let blocker = temp_path("blocker");
    std::fs::create_dir_all(blocker.parent().unwrap()).unwrap();
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = Config::default().write_to(&blocker.join("prefs.toml")).unwrap_err();
    assert!(format!("{:#}", err).starts_with("Failed to create"));
    Config::default().save_to(&blocker.join("prefs.toml"));
    assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "not a directory");
  }

  #[test]
  fn partial_and_broken_files() {
    let path = temp_path("partial");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "quality = \"small\"\n").unwrap();
    let config = Config::load_from(&path);
    assert_eq!(config.quality.as_deref(), Some("small"));
    assert_eq!(config.theme_name, None);

    std::fs::write(&path, "quality = [").unwrap();
    assert_eq!(Config::load_from(&path), Config::default());
  }
}
