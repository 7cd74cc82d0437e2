//! Grid geometry and cell-content assignment.
//!
//! The engine keeps three things consistent with each other: the rectangle
//! set (`layout`), the cell → content mapping (`contents`) and the pending
//! assignment target (`focus`). Every operation is a single synchronous
//! transition; callers never observe a half-updated grid.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::GridError;
use crate::focus::FocusTracker;
use crate::registry::CascadeClear;

/// Prefix of every cell id; the numeric suffix drives id allocation.
pub const CELL_PREFIX: &str = "cell-";

/// Cell id → assigned channel id, `None` for an empty cell.
pub type CellContents = BTreeMap<String, Option<String>>;

/// A column-count preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
  pub cell_count: usize,
  pub row_count: usize,
}

const PRESETS: [(u32, GridConfig); 5] = [
  (4, GridConfig { cell_count: 4, row_count: 2 }),
  (6, GridConfig { cell_count: 6, row_count: 2 }),
  (8, GridConfig { cell_count: 8, row_count: 2 }),
  (9, GridConfig { cell_count: 9, row_count: 3 }),
  (12, GridConfig { cell_count: 12, row_count: 3 }),
];

/// Widest supported column count. Larger requests are clamped to it.
pub const MAX_COLUMNS: u32 = PRESETS[PRESETS.len() - 1].0;

/// Used when a column count has no preset.
pub const FALLBACK_CONFIG: GridConfig = GridConfig { cell_count: 1, row_count: 1 };

pub fn grid_config(cols: u32) -> Option<GridConfig> {
  PRESETS.iter().find(|(c, _)| *c == cols).map(|(_, config)| *config)
}

/// Supported column counts, ascending.
pub fn supported_columns() -> impl Iterator<Item = u32> {
  PRESETS.iter().map(|(c, _)| *c)
}

/// Position and size of one cell, in grid units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutCell {
  pub id: String,
  pub x: u32,
  pub y: u32,
  pub w: u32,
  pub h: u32,
}

impl LayoutCell {
  pub fn right(&self) -> u32 {
    self.x.saturating_add(self.w)
  }

  pub fn bottom(&self) -> u32 {
    self.y.saturating_add(self.h)
  }

  pub fn overlaps(&self, other: &LayoutCell) -> bool {
    self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
  }
}

pub fn cell_id(index: u64) -> String {
  format!("{}{}", CELL_PREFIX, index)
}

fn cell_index(id: &str) -> Option<u64> {
  id.strip_prefix(CELL_PREFIX)?.parse().ok()
}

/// Width of a default cell: the row band split evenly between the cells of
/// one row, never narrower than one unit.
fn item_width(config: GridConfig, cols: u32) -> u32 {
  let per_row = config.cell_count.div_ceil(config.row_count.max(1)).max(1);
  ((cols as f64 / per_row as f64).round() as u32).max(1)
}

/// The canonical arrangement for a preset: `cell-0..cell-n` filled row by row.
pub fn default_layout(config: GridConfig, cols: u32) -> Vec<LayoutCell> {
  let cols = cols.max(1);
  let w = item_width(config, cols);
  let per_row = cols as f64 / w as f64;
  (0..config.cell_count)
    .map(|i| LayoutCell {
      id: cell_id(i as u64),
      x: (i as u32 * w) % cols,
      y: (i as f64 / per_row).floor() as u32,
      w,
      h: 1,
    })
    .collect()
}

/// Where a newly added cell goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
  pub x: u32,
  pub y: u32,
  pub w: u32,
  pub h: u32,
}

/// Chooses a rectangle for a cell appended by `add_cell`.
pub type PlacementStrategy = fn(&[LayoutCell], u32, GridConfig) -> Placement;

/// Best-effort placement: directly after the last cell in the layout,
/// wrapping to the next row once the row band is used up. Not a packing
/// solver; after manual resizes the result may overlap or leave gaps.
pub fn place_after_last(layout: &[LayoutCell], cols: u32, config: GridConfig) -> Placement {
  let w = item_width(config, cols).min(cols.max(1));
  let Some(last) = layout.last() else { return Placement { x: 0, y: 0, w, h: 1 } };
  let x = last.right() % cols.max(1);
  if x == 0 || x + w > cols {
    Placement { x: 0, y: last.bottom(), w, h: 1 }
  } else {
    Placement { x, y: last.y, w, h: 1 }
  }
}

pub struct GridEngine {
  cols: u32,
  layout: Vec<LayoutCell>,
  contents: CellContents,
  focus: FocusTracker,
  placement: PlacementStrategy,
}

impl GridEngine {
  /// An empty grid in the canonical arrangement for `cols`, or the 1x1
  /// fallback when `cols` has no preset.
  pub fn new(cols: u32) -> Self {
    let mut engine = Self::blank(cols);
    if let Err(e) = engine.set_columns(cols) {
      warn!(err = %e, "grid: falling back");
    }
    engine
  }

  fn blank(cols: u32) -> Self {
    Self {
      cols: cols.clamp(1, MAX_COLUMNS),
      layout: Vec::new(),
      contents: CellContents::new(),
      focus: FocusTracker::default(),
      placement: place_after_last,
    }
  }

  /// Rebuild a grid from persisted parts.
  ///
  /// Geometry is regenerated from the column preset so stale rectangles are
  /// never trusted; the stored layout is used verbatim only when `cols` has
  /// no preset. Content survives for every cell id that still exists;
  /// content of a stored cell outside the canonical id set moves into a
  /// canonical cell the stored layout lacked.
  pub fn restore(cols: u32, layout: Vec<LayoutCell>, contents: CellContents) -> Self {
    let mut engine = Self::blank(cols);
    if grid_config(cols).is_some() || layout.is_empty() {
      engine.contents = rehome_contents(&layout, contents, engine.cols);
      if let Err(e) = engine.set_columns(cols) {
        warn!(err = %e, "grid: restored column count has no preset");
      }
    } else {
      info!(cols, cells = layout.len(), "grid: no preset for stored columns, keeping stored layout");
      engine.contents = contents;
      engine.layout = dedup_cells(layout);
      engine.retain_live_contents();
    }
    engine
  }

  pub fn with_placement(mut self, placement: PlacementStrategy) -> Self {
    self.placement = placement;
    self
  }

  pub fn cols(&self) -> u32 {
    self.cols
  }

  pub fn layout(&self) -> &[LayoutCell] {
    &self.layout
  }

  pub fn contents(&self) -> &CellContents {
    &self.contents
  }

  pub fn cell(&self, cell_id: &str) -> Option<&LayoutCell> {
    self.layout.iter().find(|c| c.id == cell_id)
  }

  pub fn content_of(&self, cell_id: &str) -> Option<&str> {
    self.contents.get(cell_id).and_then(|c| c.as_deref())
  }

  pub fn config(&self) -> GridConfig {
    grid_config(self.cols).unwrap_or(FALLBACK_CONFIG)
  }

  /// Number of row units the current layout spans.
  pub fn rows_spanned(&self) -> u32 {
    self.layout.iter().map(LayoutCell::bottom).max().unwrap_or(1).max(1)
  }

  pub fn selected(&self) -> Option<&str> {
    self.focus.selected()
  }

  /// Regenerate the layout for `cols`. Content for surviving cell ids is
  /// kept, the rest dropped, and the selection cleared. An unknown column
  /// count still applies the 1x1 fallback (at most `MAX_COLUMNS` wide)
  /// before reporting `ConfigurationMissing`.
  pub fn set_columns(&mut self, cols: u32) -> Result<(), GridError> {
    let found = grid_config(cols);
    let config = found.unwrap_or(FALLBACK_CONFIG);
    self.cols = cols.clamp(1, MAX_COLUMNS);
    self.layout = default_layout(config, self.cols);
    let old = std::mem::take(&mut self.contents);
    self.contents = self.layout.iter().map(|cell| (cell.id.clone(), old.get(&cell.id).cloned().flatten())).collect();
    self.focus.clear();
    info!(cols = self.cols, cells = self.layout.len(), "grid: columns set");
    match found {
      Some(_) => Ok(()),
      None => Err(GridError::ConfigurationMissing(cols)),
    }
  }

  /// Overwrite one mapping entry. No validation of `content_id`: removal
  /// cascades take care of the reverse direction.
  pub fn set_cell_content(&mut self, cell_id: &str, content_id: Option<&str>) {
    debug!(cell = cell_id, content = ?content_id, "grid: set cell content");
    self.contents.insert(cell_id.to_string(), content_id.map(str::to_string));
  }

  pub fn clear_cell(&mut self, cell_id: &str) {
    self.set_cell_content(cell_id, None);
  }

  /// Null every cell holding `content_id`. Returns how many cells changed.
  pub fn clear_content_everywhere(&mut self, content_id: &str) -> usize {
    let mut cleared = 0;
    for value in self.contents.values_mut() {
      if value.as_deref() == Some(content_id) {
        *value = None;
        cleared += 1;
      }
    }
    cleared
  }

  /// Append an empty cell with a fresh id, placed by the placement strategy.
  pub fn add_cell(&mut self) -> Result<String, GridError> {
    let config = self.config();
    if self.layout.len() >= config.cell_count {
      info!(cells = self.layout.len(), "grid: add cell refused, at capacity");
      return Err(GridError::AtCapacity(config.cell_count));
    }
    let next = self.layout.iter().filter_map(|c| cell_index(&c.id)).max().map_or(0, |max| max + 1);
    let id = cell_id(next);
    let Placement { x, y, w, h } = (self.placement)(&self.layout, self.cols, config);
    self.layout.push(LayoutCell { id: id.clone(), x, y, w, h });
    self.contents.insert(id.clone(), None);
    info!(cell = %id, x, y, "grid: cell added");
    Ok(id)
  }

  /// Remove a cell and its content mapping. Returns `false` for unknown ids.
  pub fn remove_cell(&mut self, cell_id: &str) -> bool {
    let before = self.layout.len();
    self.layout.retain(|c| c.id != cell_id);
    self.contents.remove(cell_id);
    self.focus.forget(cell_id);
    let removed = self.layout.len() != before;
    if removed {
      info!(cell = cell_id, "grid: cell removed");
    }
    removed
  }

  /// Snap geometry back to the canonical arrangement. `contents` is left
  /// untouched.
  pub fn reset_layout(&mut self) {
    self.layout = default_layout(self.config(), self.cols);
    self.focus.clear();
    info!(cols = self.cols, "grid: layout reset");
  }

  /// Replace the geometry with rectangles reported by the interactive
  /// layout collaborator. Overlap and bounds are that collaborator's
  /// business; only duplicate ids are dropped.
  pub fn apply_external_layout_change(&mut self, cells: Vec<LayoutCell>) {
    self.layout = dedup_cells(cells);
    self.focus.retain_in(&self.layout);
    debug!(cells = self.layout.len(), "grid: external layout applied");
  }

  /// Select a cell as the next assignment target. Unknown ids are refused.
  pub fn select(&mut self, cell_id: Option<&str>) -> bool {
    match cell_id {
      Some(id) if self.cell(id).is_none() => false,
      _ => {
        self.focus.select(cell_id);
        true
      }
    }
  }

  pub fn clear_selection(&mut self) {
    self.focus.clear();
  }

  pub fn resolve_assignment_target(&self) -> Result<String, GridError> {
    self.focus.resolve_target(&self.layout, &self.contents)
  }

  /// Clear content ids for which `keep` returns false.
  pub fn retain_contents(&mut self, keep: impl Fn(&str) -> bool) {
    for value in self.contents.values_mut() {
      if value.as_deref().is_some_and(|id| !keep(id)) {
        *value = None;
      }
    }
  }

  fn retain_live_contents(&mut self) {
    let ids: HashSet<&str> = self.layout.iter().map(|c| c.id.as_str()).collect();
    self.contents.retain(|k, _| ids.contains(k.as_str()));
  }
}

impl CascadeClear for GridEngine {
  fn clear_content_everywhere(&mut self, content_id: &str) -> usize {
    GridEngine::clear_content_everywhere(self, content_id)
  }
}

/// Carry content from stored cells that the canonical layout for `cols` will
/// not recreate (ids allocated by `add_cell` after a removal) into canonical
/// cells missing from the stored layout, pairing both in order.
fn rehome_contents(stored: &[LayoutCell], mut contents: CellContents, cols: u32) -> CellContents {
  let canonical = default_layout(grid_config(cols).unwrap_or(FALLBACK_CONFIG), cols);
  let canonical_ids: HashSet<&str> = canonical.iter().map(|c| c.id.as_str()).collect();
  let stored_ids: HashSet<&str> = stored.iter().map(|c| c.id.as_str()).collect();

  let vacant = canonical.iter().map(|c| c.id.as_str()).filter(|id| !stored_ids.contains(id));
  let orphans = stored.iter().map(|c| c.id.as_str()).filter(|id| !canonical_ids.contains(id));
  let moves: Vec<(String, String)> = orphans.zip(vacant).map(|(from, to)| (from.to_string(), to.to_string())).collect();

  for (from, to) in moves {
    if let Some(content) = contents.remove(&from) {
      debug!(from = %from, to = %to, "grid: moving restored content");
      contents.insert(to, content);
    }
  }
  contents
}

fn dedup_cells(cells: Vec<LayoutCell>) -> Vec<LayoutCell> {
  let mut seen = HashSet::new();
  let total = cells.len();
  let unique: Vec<LayoutCell> = cells.into_iter().filter(|c| seen.insert(c.id.clone())).collect();
  if unique.len() != total {
    warn!(dropped = total - unique.len(), "grid: dropped cells with duplicate ids");
  }
  unique
}
