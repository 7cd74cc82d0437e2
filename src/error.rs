use thiserror::Error;

/// Recoverable outcomes of registry and grid operations.
///
/// None of these leave state half-applied; the caller surfaces them as a
/// transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
  #[error("invalid YouTube URL or ID: {0}")]
  InvalidReference(String),
  #[error("{0} is already in the channel list")]
  DuplicateReference(String),
  #[error("no channel with ID {0}")]
  UnknownChannel(String),
  #[error("no cell named {0}")]
  UnknownCell(String),
  #[error("no empty cell available, select or clear a cell first")]
  NoTargetAvailable,
  #[error("grid is full ({0} cells for this column count)")]
  AtCapacity(usize),
  /// The 1x1 fallback layout has already been applied when this is returned.
  #[error("no grid preset for {0} columns, using a 1x1 layout")]
  ConfigurationMissing(u32),
}

/// Outcomes of a display-name lookup. All of them are non-fatal: the id is
/// always an acceptable display name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
  #[error("no YouTube API key configured")]
  Unavailable,
  #[error("no title found")]
  NotFound,
  #[error("lookup request failed: {0}")]
  Request(String),
}
