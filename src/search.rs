use tracing::debug;

use crate::youtube::SearchItem;

/// State of the search panel.
///
/// Every query gets a generation number; a response whose generation is no
/// longer current (superseded or cleared) is dropped on arrival.
#[derive(Debug, Default)]
pub struct SearchSession {
  term: String,
  generation: u64,
  results: Vec<SearchItem>,
  loading: bool,
  error: Option<String>,
}

impl SearchSession {
  /// Start a query for `term`. A blank term clears the session instead and
  /// returns `None`.
  pub fn begin(&mut self, term: &str) -> Option<u64> {
    let term = term.trim();
    if term.is_empty() {
      self.clear();
      return None;
    }
    self.generation += 1;
    self.term = term.to_string();
    self.loading = true;
    self.error = None;
    Some(self.generation)
  }

  /// Apply a response. Returns `false` when it was stale.
  pub fn complete(&mut self, generation: u64, result: Result<Vec<SearchItem>, String>) -> bool {
    if generation != self.generation || !self.loading {
      debug!(generation, current = self.generation, "search: stale response dropped");
      return false;
    }
    self.loading = false;
    match result {
      Ok(items) => {
        self.error = if items.is_empty() { Some("No results found.".to_string()) } else { None };
        self.results = items;
      }
      Err(e) => {
        self.error = Some(e);
        self.results.clear();
      }
    }
    true
  }

  pub fn clear(&mut self) {
    self.generation += 1;
    self.term.clear();
    self.results.clear();
    self.loading = false;
    self.error = None;
  }

  pub fn term(&self) -> &str {
    &self.term
  }

  pub fn results(&self) -> &[SearchItem] {
    &self.results
  }

  pub fn get(&self, idx: usize) -> Option<&SearchItem> {
    self.results.get(idx)
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }
}
