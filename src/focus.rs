use crate::error::GridError;
use crate::grid::{CellContents, LayoutCell};

/// Which cell receives the next content assignment.
///
/// Holds a back-reference only: the grid engine clears it whenever the
/// referenced cell disappears.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FocusTracker {
  selected: Option<String>,
}

impl FocusTracker {
  pub fn select(&mut self, cell_id: Option<&str>) {
    self.selected = cell_id.map(str::to_string);
  }

  pub fn selected(&self) -> Option<&str> {
    self.selected.as_deref()
  }

  pub fn clear(&mut self) {
    self.selected = None;
  }

  /// Drop the selection if it points at `cell_id`.
  pub fn forget(&mut self, cell_id: &str) {
    if self.selected.as_deref() == Some(cell_id) {
      self.selected = None;
    }
  }

  /// Drop the selection if its cell is no longer part of `layout`.
  pub fn retain_in(&mut self, layout: &[LayoutCell]) {
    if let Some(ref id) = self.selected
      && !layout.iter().any(|c| &c.id == id)
    {
      self.selected = None;
    }
  }

  /// The explicit selection, or else the first empty cell in layout order.
  pub fn resolve_target(&self, layout: &[LayoutCell], contents: &CellContents) -> Result<String, GridError> {
    if let Some(ref id) = self.selected {
      return Ok(id.clone());
    }
    layout
      .iter()
      .find(|cell| contents.get(&cell.id).is_none_or(|c| c.is_none()))
      .map(|cell| cell.id.clone())
      .ok_or(GridError::NoTargetAvailable)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cell(id: &str, x: u32) -> LayoutCell {
    LayoutCell { id: id.to_string(), x, y: 0, w: 1, h: 1 }
  }

  fn contents(pairs: &[(&str, Option<&str>)]) -> CellContents {
    pairs.iter().map(|(k, v)| (k.to_string(), v.map(str::to_string))).collect()
  }

  #[test]
  fn first_empty_cell_when_nothing_selected() {
    let layout = vec![cell("cell-0", 0), cell("cell-1", 1), cell("cell-2", 2)];
    let c = contents(&[("cell-0", Some("A")), ("cell-1", None), ("cell-2", Some("B"))]);
    assert_eq!(FocusTracker::default().resolve_target(&layout, &c), Ok("cell-1".to_string()));
  }

  #[test]
  fn cell_without_contents_entry_counts_as_empty() {
    let layout = vec![cell("cell-0", 0), cell("cell-1", 1)];
    let c = contents(&[("cell-0", Some("A"))]);
    assert_eq!(FocusTracker::default().resolve_target(&layout, &c), Ok("cell-1".to_string()));
  }

  #[test]
  fn full_grid_has_no_target() {
    let layout = vec![cell("cell-0", 0), cell("cell-1", 1)];
    let c = contents(&[("cell-0", Some("A")), ("cell-1", Some("B"))]);
    assert_eq!(FocusTracker::default().resolve_target(&layout, &c), Err(GridError::NoTargetAvailable));
  }

  #[test]
  fn explicit_selection_wins_even_when_occupied() {
    let layout = vec![cell("cell-0", 0), cell("cell-1", 1)];
    let c = contents(&[("cell-0", Some("A")), ("cell-1", None)]);
    let mut focus = FocusTracker::default();
    focus.select(Some("cell-0"));
    assert_eq!(focus.resolve_target(&layout, &c), Ok("cell-0".to_string()));
  }

  #[test]
  fn forget_and_retain_clear_stale_selection() {
    let mut focus = FocusTracker::default();
    focus.select(Some("cell-1"));
    focus.forget("cell-0");
    assert_eq!(focus.selected(), Some("cell-1"));
    focus.forget("cell-1");
    assert_eq!(focus.selected(), None);

    focus.select(Some("cell-9"));
    focus.retain_in(&[cell("cell-0", 0)]);
    assert_eq!(focus.selected(), None);
  }
}
