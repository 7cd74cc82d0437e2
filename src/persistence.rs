//! Reload-safe storage of the registry and grid state.
//!
//! The whole state is one small JSON document carrying a `version` field. A
//! document that is missing, empty, malformed or from another version loads
//! as "no state", and the caller bootstraps defaults instead.

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::constants;
use crate::grid::{CellContents, LayoutCell};
use crate::registry::Channel;

/// Bumped whenever the document shape changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 2;

fn default_cols() -> u32 {
  constants().default_grid_cols
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  pub version: u32,
  #[serde(default)]
  pub channels: Vec<Channel>,
  #[serde(default = "default_cols")]
  pub grid_cols: u32,
  #[serde(default)]
  pub layout: Vec<LayoutCell>,
  #[serde(default)]
  pub cell_contents: CellContents,
}

/// Write-through storage for snapshots. Single writer, single reader.
pub trait SnapshotStore {
  fn save(&self, snapshot: &Snapshot) -> Result<()>;

  /// `None` for first run or unrecognizable data.
  fn load(&self) -> Option<Snapshot>;
}

/// Parse a stored document, rejecting anything that isn't a current-version
/// snapshot.
pub fn decode(raw: &str) -> Option<Snapshot> {
  if raw.trim().is_empty() {
    return None;
  }
  let value: serde_json::Value = match serde_json::from_str(raw) {
    Ok(v) => v,
    Err(e) => {
      warn!(err = %e, "persistence: snapshot is not valid JSON, starting fresh");
      return None;
    }
  };
  let version = value.get("version").and_then(|v| v.as_u64());
  if version != Some(SNAPSHOT_VERSION as u64) {
    warn!(found = ?version, expected = SNAPSHOT_VERSION, "persistence: snapshot version mismatch, starting fresh");
    return None;
  }
  match serde_json::from_value(value) {
    Ok(snapshot) => Some(snapshot),
    Err(e) => {
      warn!(err = %e, "persistence: snapshot has an unexpected shape, starting fresh");
      None
    }
  }
}

pub fn encode(snapshot: &Snapshot) -> Result<String> {
  serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")
}

/// Snapshot stored as a JSON file, by default `state.json` in the platform
/// data directory.
pub struct JsonFileStore {
  path: PathBuf,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn default_path() -> Result<PathBuf> {
    let c = constants();
    let dirs = ProjectDirs::from("", "", &c.project_name).ok_or_else(|| anyhow!("No home directory found"))?;
    Ok(dirs.data_dir().join(&c.snapshot_file))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Delete the stored snapshot so the next load bootstraps defaults.
  pub fn discard(&self) -> Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(anyhow!(e).context(format!("Failed to remove {}", self.path.display()))),
    }
  }
}

impl SnapshotStore for JsonFileStore {
  fn save(&self, snapshot: &Snapshot) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let payload = encode(snapshot)?;
    // Write then rename so a crash mid-write never leaves a truncated file.
    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, payload).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, &self.path).with_context(|| format!("Failed to replace {}", self.path.display()))?;
    debug!(path = %self.path.display(), "persistence: snapshot saved");
    Ok(())
  }

  fn load(&self) -> Option<Snapshot> {
    match std::fs::read_to_string(&self.path) {
      Ok(raw) => decode(&raw),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
      Err(e) => {
        warn!(path = %self.path.display(), err = %e, "persistence: failed to read snapshot");
        None
      }
    }
  }
}

/// In-memory store that still goes through the JSON encoding.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
  pub raw: std::cell::RefCell<Option<String>>,
  pub saves: std::cell::Cell<usize>,
}

#[cfg(test)]
impl SnapshotStore for MemoryStore {
  fn save(&self, snapshot: &Snapshot) -> Result<()> {
    *self.raw.borrow_mut() = Some(encode(snapshot)?);
    self.saves.set(self.saves.get() + 1);
    Ok(())
  }

  fn load(&self) -> Option<Snapshot> {
    self.raw.borrow().as_deref().and_then(decode)
  }
}
