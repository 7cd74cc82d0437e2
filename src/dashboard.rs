//! The dashboard service: registry, grid and persistence wired together.
//!
//! Every mutating call leaves registry and grid consistent and writes a
//! snapshot before returning. Write failures are logged, never surfaced as
//! operation failures.

use tracing::{info, warn};

use crate::constants::constants;
use crate::error::{GridError, LookupError};
use crate::grid::{GridEngine, LayoutCell};
use crate::persistence::{SNAPSHOT_VERSION, Snapshot, SnapshotStore};
use crate::reference::{self, ContentKind};
use crate::registry::{Channel, ChannelPatch, ContentRegistry, NewChannel, Reservation};
use crate::youtube::SearchItem;

/// Where a search result ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
  pub cell_id: String,
  pub channel_id: String,
  /// Whether the channel was added to the registry by this assignment.
  pub added: bool,
}

pub struct Dashboard<S: SnapshotStore> {
  registry: ContentRegistry,
  grid: GridEngine,
  store: S,
}

impl<S: SnapshotStore> Dashboard<S> {
  /// Restore persisted state, or bootstrap defaults on first run.
  pub fn open(store: S) -> Self {
    match store.load() {
      Some(snapshot) => Self::restore(snapshot, store),
      None => {
        info!("dashboard: no stored state, bootstrapping defaults");
        let dashboard = Self::bootstrap(store);
        dashboard.persist();
        dashboard
      }
    }
  }

  fn restore(snapshot: Snapshot, store: S) -> Self {
    let registry = ContentRegistry::from_channels(snapshot.channels);
    let mut grid = GridEngine::restore(snapshot.grid_cols, snapshot.layout, snapshot.cell_contents);
    grid.retain_contents(|id| registry.contains(id));
    info!(channels = registry.len(), cols = grid.cols(), cells = grid.layout().len(), "dashboard: state restored");
    Self { registry, grid, store }
  }

  /// Default 4-column grid with the seed channels in its first cells.
  pub fn bootstrap(store: S) -> Self {
    let (registry, grid) = defaults();
    Self { registry, grid, store }
  }

  /// Drop every channel and the layout, then start over from the first-run
  /// defaults.
  pub fn reset_all(&mut self) {
    (self.registry, self.grid) = defaults();
    info!("dashboard: reset to defaults");
    self.persist();
  }

  pub fn registry(&self) -> &ContentRegistry {
    &self.registry
  }

  pub fn grid(&self) -> &GridEngine {
    &self.grid
  }

  #[cfg(test)]
  pub fn store(&self) -> &S {
    &self.store
  }

  /// Channel assigned to `cell_id`, if any.
  pub fn channel_in(&self, cell_id: &str) -> Option<&Channel> {
    self.grid.content_of(cell_id).and_then(|id| self.registry.get(id))
  }

  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      version: SNAPSHOT_VERSION,
      channels: self.registry.channels().to_vec(),
      grid_cols: self.grid.cols(),
      layout: self.grid.layout().to_vec(),
      cell_contents: self.grid.contents().clone(),
    }
  }

  fn persist(&self) {
    if let Err(e) = self.store.save(&self.snapshot()) {
      warn!(err = %format!("{:#}", e), "dashboard: failed to persist state");
    }
  }

  // --- Registry ---

  /// Reserve a channel. When the returned reservation carries a lookup, the
  /// caller runs it and reports back through `complete_name_lookup`.
  pub fn add_channel(&mut self, new: NewChannel) -> Result<Reservation, GridError> {
    let reservation = self.registry.add(new)?;
    self.persist();
    Ok(reservation)
  }

  pub fn complete_name_lookup(&mut self, id: &str, result: Result<String, LookupError>) -> bool {
    let changed = self.registry.apply_resolved_name(id, result);
    if changed {
      self.persist();
    }
    changed
  }

  /// Remove a channel and clear it out of every cell.
  pub fn remove_channel(&mut self, id: &str) -> Result<Channel, GridError> {
    let removed = self.registry.remove(id, &mut self.grid).ok_or_else(|| GridError::UnknownChannel(id.to_string()))?;
    self.persist();
    Ok(removed)
  }

  pub fn rename_channel(&mut self, id: &str, name: &str) -> Result<(), GridError> {
    self.registry.rename(id, name)?;
    self.persist();
    Ok(())
  }

  pub fn update_channel(&mut self, id: &str, patch: ChannelPatch) -> Result<(), GridError> {
    self.registry.update(id, patch)?;
    self.persist();
    Ok(())
  }

  // --- Grid ---

  /// Change the column preset. The layout is regenerated (1x1 fallback for
  /// unknown counts) and persisted even when `ConfigurationMissing` is
  /// returned.
  pub fn set_columns(&mut self, cols: u32) -> Result<(), GridError> {
    let result = self.grid.set_columns(cols);
    self.persist();
    result
  }

  pub fn add_cell(&mut self) -> Result<String, GridError> {
    let id = self.grid.add_cell()?;
    self.persist();
    Ok(id)
  }

  pub fn remove_cell(&mut self, cell_id: &str) -> Result<(), GridError> {
    if !self.grid.remove_cell(cell_id) {
      return Err(GridError::UnknownCell(cell_id.to_string()));
    }
    self.persist();
    Ok(())
  }

  pub fn reset_layout(&mut self) {
    self.grid.reset_layout();
    self.persist();
  }

  pub fn apply_layout_change(&mut self, cells: Vec<LayoutCell>) {
    self.grid.apply_external_layout_change(cells);
    self.persist();
  }

  /// Selection is transient and not persisted.
  pub fn select_cell(&mut self, cell_id: Option<&str>) -> Result<(), GridError> {
    if self.grid.select(cell_id) {
      Ok(())
    } else {
      Err(GridError::UnknownCell(cell_id.unwrap_or_default().to_string()))
    }
  }

  pub fn clear_cell(&mut self, cell_id: &str) -> Result<(), GridError> {
    if self.grid.cell(cell_id).is_none() {
      return Err(GridError::UnknownCell(cell_id.to_string()));
    }
    self.grid.clear_cell(cell_id);
    self.persist();
    Ok(())
  }

  // --- Assignment ---

  /// Put a saved channel into the assignment target (selection, else the
  /// first empty cell). Returns the cell it landed in.
  pub fn assign_channel(&mut self, channel_id: &str) -> Result<String, GridError> {
    if !self.registry.contains(channel_id) {
      return Err(GridError::UnknownChannel(channel_id.to_string()));
    }
    let target = self.grid.resolve_assignment_target()?;
    self.place(&target, channel_id);
    Ok(target)
  }

  /// Put a saved channel into a specific cell.
  pub fn assign_to_cell(&mut self, cell_id: &str, channel_id: &str) -> Result<(), GridError> {
    if self.grid.cell(cell_id).is_none() {
      return Err(GridError::UnknownCell(cell_id.to_string()));
    }
    if !self.registry.contains(channel_id) {
      return Err(GridError::UnknownChannel(channel_id.to_string()));
    }
    self.place(cell_id, channel_id);
    Ok(())
  }

  /// Save a search result (unless it is already saved) and show it in the
  /// assignment target.
  pub fn assign_result_to_grid(&mut self, item: &SearchItem) -> Result<Assignment, GridError> {
    let target = self.grid.resolve_assignment_target()?;
    let (channel_id, added) = if self.registry.contains(&item.id) {
      (item.id.clone(), false)
    } else {
      let kind = item.kind.content_kind();
      let new =
        NewChannel { url: reference::watch_url(kind, &item.id), name: Some(item.title.clone()), kind: Some(kind) };
      (self.registry.add(new)?.channel.id, true)
    };
    self.place(&target, &channel_id);
    Ok(Assignment { cell_id: target, channel_id, added })
  }

  fn place(&mut self, cell_id: &str, channel_id: &str) {
    self.grid.set_cell_content(cell_id, Some(channel_id));
    self.grid.clear_selection();
    info!(cell = cell_id, channel = channel_id, "dashboard: assigned");
    self.persist();
  }
}

fn defaults() -> (ContentRegistry, GridEngine) {
  let mut registry = ContentRegistry::new();
  let mut grid = GridEngine::new(constants().default_grid_cols);
  let cells: Vec<String> = grid.layout().iter().map(|c| c.id.clone()).collect();
  let mut cells = cells.into_iter();

  for seed in &constants().seed_channels {
    let new =
      NewChannel { url: seed.url.clone(), name: Some(seed.name.clone()), kind: ContentKind::from_label(&seed.kind) };
    match registry.add(new) {
      Ok(reservation) => {
        if let Some(cell) = cells.next() {
          grid.set_cell_content(&cell, Some(&reservation.channel.id));
        }
      }
      Err(e) => warn!(url = %seed.url, err = %e, "dashboard: skipping seed channel"),
    }
  }
  (registry, grid)
}
