use anyhow::Result;
use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::constants;
use crate::dashboard::Dashboard;
use crate::error::{GridError, LookupError};
use crate::grid::{LayoutCell, supported_columns};
use crate::persistence::{JsonFileStore, SnapshotStore};
use crate::reference::{self, ContentKind};
use crate::registry::{Channel, NameRequest, NewChannel};
use crate::search::SearchSession;
use crate::theme::{THEMES, Theme, theme_index};
use crate::youtube::{NameLookup, SearchItem, YouTubeClient};

// --- Types ---

pub type LookupResult = (String, Result<String, LookupError>);

/// Target playback quality applied to every player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
  Auto,
  Small,
  Medium,
  Large,
  Hd720,
  Hd1080,
  Highres,
}

impl Quality {
  pub const ALL: [Quality; 7] =
    [Quality::Auto, Quality::Small, Quality::Medium, Quality::Large, Quality::Hd720, Quality::Hd1080, Quality::Highres];

  pub fn label(self) -> &'static str {
    match self {
      Quality::Auto => "auto",
      Quality::Small => "small",
      Quality::Medium => "medium",
      Quality::Large => "large",
      Quality::Hd720 => "hd720",
      Quality::Hd1080 => "hd1080",
      Quality::Highres => "highres",
    }
  }

  pub fn from_config(s: &str) -> Self {
    Quality::ALL.into_iter().find(|q| q.label().eq_ignore_ascii_case(s)).unwrap_or(Quality::Auto)
  }

  fn step(self, forward: bool) -> Self {
    // Safety: position() is always Some for a variant of ALL.
    let idx = Quality::ALL.iter().position(|q| *q == self).unwrap_or(0);
    let len = Quality::ALL.len();
    Quality::ALL[if forward { (idx + 1) % len } else { (idx + len - 1) % len }]
  }
}

/// Global state shared by every player in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerControls {
  pub muted: bool,
  pub playing: bool,
  pub quality: Quality,
}

impl Default for PlayerControls {
  fn default() -> Self {
    Self { muted: false, playing: true, quality: Quality::Auto }
  }
}

impl PlayerControls {
  /// Query string for embed URLs reflecting the current state.
  pub fn embed_params(&self) -> String {
    format!("autoplay={}&mute={}&vq={}", u8::from(self.playing), u8::from(self.muted), self.quality.label())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Left,
  Right,
  Up,
  Down,
}

impl Direction {
  fn delta(self) -> (i32, i32) {
    match self {
      Direction::Left => (-1, 0),
      Direction::Right => (1, 0),
      Direction::Up => (0, -1),
      Direction::Down => (0, 1),
    }
  }
}

/// What the text input is collecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
  AddChannel,
  Search,
  Rename(String),
}

impl InputPurpose {
  pub fn title(&self) -> &'static str {
    match self {
      InputPurpose::AddChannel => " Add channel: URL [| name [| kind]] ",
      InputPurpose::Search => " Search YouTube ",
      InputPurpose::Rename(_) => " Rename channel ",
    }
  }
}

/// Destructive actions waiting for a y/n answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
  RemoveChannel(String),
  ResetAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
  Quality,
  Columns,
  Theme,
  ApiKey,
  Reset,
}

impl SettingsRow {
  pub const ALL: [SettingsRow; 5] =
    [SettingsRow::Quality, SettingsRow::Columns, SettingsRow::Theme, SettingsRow::ApiKey, SettingsRow::Reset];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
  Grid,
  Channels,
  Results,
  Input(InputPurpose),
  Settings,
  Confirm(Confirm),
}

/// In-flight async task receivers.
pub(crate) struct AsyncTasks {
  pub(crate) search_rx: Option<(u64, oneshot::Receiver<Result<Vec<SearchItem>>>)>,
  lookup_tx: mpsc::UnboundedSender<LookupResult>,
  pub(crate) lookup_rx: mpsc::UnboundedReceiver<LookupResult>,
}

impl AsyncTasks {
  fn new() -> Self {
    let (lookup_tx, lookup_rx) = mpsc::unbounded_channel();
    Self { search_rx: None, lookup_tx, lookup_rx }
  }
}

// --- Layout helpers ---

/// Whether `candidate` can replace the cell at `idx`: inside `cols` x `rows`,
/// at least one unit in each direction, and clear of every other cell.
pub fn fits(layout: &[LayoutCell], idx: usize, candidate: &LayoutCell, cols: u32, rows: u32) -> bool {
  candidate.w >= 1
    && candidate.h >= 1
    && candidate.right() <= cols
    && candidate.bottom() <= rows
    && layout.iter().enumerate().all(|(i, other)| i == idx || !candidate.overlaps(other))
}

/// The nearest cell from `from` in direction `dir`, by distance between
/// centres along the movement axis first.
pub fn neighbor(layout: &[LayoutCell], from: usize, dir: Direction) -> Option<usize> {
  let cur = layout.get(from)?;
  let centre = |c: &LayoutCell| (2 * c.x as i64 + c.w as i64, 2 * c.y as i64 + c.h as i64);
  let (cx, cy) = centre(cur);
  layout
    .iter()
    .enumerate()
    .filter(|(i, other)| {
      *i != from
        && match dir {
          Direction::Left => other.right() <= cur.x,
          Direction::Right => other.x >= cur.right(),
          Direction::Up => other.bottom() <= cur.y,
          Direction::Down => other.y >= cur.bottom(),
        }
    })
    .min_by_key(|(_, other)| {
      let (ox, oy) = centre(other);
      match dir {
        Direction::Left | Direction::Right => ((ox - cx).abs(), (oy - cy).abs()),
        Direction::Up | Direction::Down => ((oy - cy).abs(), (ox - cx).abs()),
      }
    })
    .map(|(i, _)| i)
}

/// Parse the add prompt: `url [| name [| kind]]`. Blank fields count as
/// missing.
pub fn parse_add_input(text: &str) -> Result<NewChannel, String> {
  let mut fields = text.split('|').map(str::trim);
  let url = fields.next().unwrap_or_default().to_string();
  let name = fields.next().filter(|n| !n.is_empty()).map(str::to_string);
  let kind = match fields.next().filter(|k| !k.is_empty()) {
    Some(label) => Some(ContentKind::from_label(label).ok_or_else(|| format!("unknown kind '{}'", label))?),
    None => None,
  };
  if fields.next().is_some() {
    return Err("expected at most: URL | name | kind".to_string());
  }
  Ok(NewChannel { url, name, kind })
}

pub struct App<S: SnapshotStore = JsonFileStore> {
  pub dashboard: Dashboard<S>,
  client: YouTubeClient,
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,
  pub theme_index: usize,
  /// Index into the layout of the keyboard cursor.
  pub cursor: usize,
  pub channel_state: ListState,
  pub results_state: ListState,
  pub settings_index: usize,
  pub search: SearchSession,
  pub player: PlayerControls,
  pub channel_list_visible: bool,
  pub chat_visible: bool,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, lower priority than status/error.
  pub info_message: Option<String>,
  pub should_quit: bool,
  pub(crate) tasks: AsyncTasks,
  persist_prefs: bool,
  /// When the last error or info message was set, for auto-dismiss.
  notice_time: Option<Instant>,
}

impl<S: SnapshotStore> App<S> {
  pub fn new(dashboard: Dashboard<S>, client: YouTubeClient, config: Config) -> Self {
    let mut channel_state = ListState::default();
    if !dashboard.registry().is_empty() {
      channel_state.select(Some(0));
    }
    Self {
      dashboard,
      client,
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      mode: AppMode::Grid,
      theme_index: theme_index(config.theme_name.as_deref()),
      cursor: 0,
      channel_state,
      results_state: ListState::default(),
      settings_index: 0,
      search: SearchSession::default(),
      player: PlayerControls {
        quality: config.quality.as_deref().map(Quality::from_config).unwrap_or(Quality::Auto),
        ..PlayerControls::default()
      },
      channel_list_visible: config.channel_list_visible.unwrap_or(true),
      chat_visible: false,
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      tasks: AsyncTasks::new(),
      persist_prefs: !cfg!(test),
      notice_time: None,
    }
  }

  pub fn theme(&self) -> &'static Theme {
    // Safety: theme_index is bounded by theme_index() and modular arithmetic in next_theme().
    &THEMES[self.theme_index]
  }

  pub fn has_api_key(&self) -> bool {
    self.client.has_key()
  }

  // --- Notifications ---

  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.info_message = None;
    self.notice_time = Some(Instant::now());
  }

  pub fn set_info(&mut self, msg: String) {
    self.info_message = Some(msg);
    self.last_error = None;
    self.notice_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
  }

  /// Clear error and info messages once they have been shown long enough.
  pub fn expire_notifications(&mut self) {
    if let Some(t) = self.notice_time
      && t.elapsed() >= Duration::from_secs(constants().notification_secs)
    {
      self.last_error = None;
      self.info_message = None;
      self.notice_time = None;
    }
  }

  fn report<T>(&mut self, result: Result<T, GridError>) -> Option<T> {
    match result {
      Ok(v) => Some(v),
      Err(e) => {
        debug!(err = %e, "app: operation rejected");
        self.set_error(e.to_string());
        None
      }
    }
  }

  // --- Preferences ---

  fn save_config(&self) {
    if !self.persist_prefs {
      return;
    }
    let config = Config {
      theme_name: Some(self.theme().name.to_string()),
      quality: Some(self.player.quality.label().to_string()),
      channel_list_visible: Some(self.channel_list_visible),
    };
    config.save();
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.save_config();
  }

  pub fn step_quality(&mut self, forward: bool) {
    self.player.quality = self.player.quality.step(forward);
    info!(quality = self.player.quality.label(), "player: target quality");
    self.save_config();
  }

  pub fn toggle_channel_list(&mut self) {
    self.channel_list_visible = !self.channel_list_visible;
    if !self.channel_list_visible && self.mode == AppMode::Channels {
      self.mode = AppMode::Grid;
    }
    self.save_config();
  }

  pub fn toggle_chat(&mut self) {
    self.chat_visible = !self.chat_visible;
  }

  pub fn toggle_mute(&mut self) {
    self.player.muted = !self.player.muted;
    self.set_info(if self.player.muted { "All players muted".into() } else { "All players unmuted".into() });
  }

  pub fn toggle_play(&mut self) {
    self.player.playing = !self.player.playing;
    self.set_info(if self.player.playing { "Playing all".into() } else { "Paused all".into() });
  }

  // --- Grid cursor ---

  pub fn cursor_cell(&self) -> Option<&LayoutCell> {
    self.dashboard.grid().layout().get(self.cursor)
  }

  /// Channel shown in the cell under the cursor.
  pub fn cursor_channel(&self) -> Option<&Channel> {
    self.cursor_cell().and_then(|cell| self.dashboard.channel_in(&cell.id))
  }

  fn clamp_cursor(&mut self) {
    let len = self.dashboard.grid().layout().len();
    self.cursor = self.cursor.min(len.saturating_sub(1));
  }

  fn cursor_to(&mut self, cell_id: &str) {
    if let Some(idx) = self.dashboard.grid().layout().iter().position(|c| c.id == cell_id) {
      self.cursor = idx;
    }
  }

  pub fn move_cursor(&mut self, dir: Direction) {
    if let Some(idx) = neighbor(self.dashboard.grid().layout(), self.cursor, dir) {
      self.cursor = idx;
    }
  }

  /// Select the cell under the cursor as the assignment target, or deselect
  /// it when it already is.
  pub fn toggle_select(&mut self) {
    let Some(id) = self.cursor_cell().map(|c| c.id.clone()) else { return };
    let target = if self.dashboard.grid().selected() == Some(id.as_str()) { None } else { Some(id.as_str()) };
    let result = self.dashboard.select_cell(target);
    self.report(result);
  }

  fn transform_cursor_cell(&mut self, f: impl Fn(&LayoutCell) -> Option<LayoutCell>) {
    let grid = self.dashboard.grid();
    let Some(cell) = grid.layout().get(self.cursor) else { return };
    let rows = (grid.config().row_count as u32).max(grid.rows_spanned());
    let accepted = f(cell).filter(|candidate| fits(grid.layout(), self.cursor, candidate, grid.cols(), rows));
    let Some(candidate) = accepted else {
      self.set_error("Cell can't go there".to_string());
      return;
    };
    let mut layout = grid.layout().to_vec();
    layout[self.cursor] = candidate;
    self.dashboard.apply_layout_change(layout);
  }

  /// Shift the focused cell one unit.
  pub fn nudge_cell(&mut self, dir: Direction) {
    let (dx, dy) = dir.delta();
    self.transform_cursor_cell(|c| {
      Some(LayoutCell { x: c.x.checked_add_signed(dx)?, y: c.y.checked_add_signed(dy)?, ..c.clone() })
    });
  }

  /// Grow or shrink the focused cell one unit from its top-left corner.
  pub fn resize_cell(&mut self, dw: i32, dh: i32) {
    self.transform_cursor_cell(|c| {
      Some(LayoutCell { w: c.w.checked_add_signed(dw)?, h: c.h.checked_add_signed(dh)?, ..c.clone() })
    });
  }

  // --- Grid operations ---

  /// Move to the next (or previous) supported column count.
  pub fn step_columns(&mut self, forward: bool) {
    let presets: Vec<u32> = supported_columns().collect();
    let cur = self.dashboard.grid().cols();
    let next = if forward {
      presets.iter().copied().find(|c| *c > cur).unwrap_or(presets[0])
    } else {
      presets.iter().rev().copied().find(|c| *c < cur).unwrap_or(presets[presets.len() - 1])
    };
    let result = self.dashboard.set_columns(next);
    if self.report(result).is_some() {
      self.set_info(format!("{} columns", next));
    }
    self.clamp_cursor();
  }

  pub fn add_cell(&mut self) {
    let result = self.dashboard.add_cell();
    if let Some(id) = self.report(result) {
      self.cursor_to(&id);
    }
  }

  pub fn remove_cursor_cell(&mut self) {
    let Some(id) = self.cursor_cell().map(|c| c.id.clone()) else { return };
    let result = self.dashboard.remove_cell(&id);
    self.report(result);
    self.clamp_cursor();
  }

  pub fn clear_cursor_cell(&mut self) {
    let Some(id) = self.cursor_cell().map(|c| c.id.clone()) else { return };
    let result = self.dashboard.clear_cell(&id);
    self.report(result);
  }

  pub fn reset_layout(&mut self) {
    self.dashboard.reset_layout();
    self.clamp_cursor();
    self.set_info("Layout reset".to_string());
  }

  pub fn reset_all(&mut self) {
    self.dashboard.reset_all();
    self.cursor = 0;
    self.channel_state.select(Some(0));
    self.search.clear();
    self.set_info("Everything reset to defaults".to_string());
  }

  // --- Channels ---

  pub fn selected_channel(&self) -> Option<&Channel> {
    self.channel_state.selected().and_then(|i| self.dashboard.registry().channels().get(i))
  }

  fn clamp_channel_selection(&mut self) {
    let len = self.dashboard.registry().len();
    if len == 0 {
      self.channel_state.select(None);
    } else {
      let i = self.channel_state.selected().unwrap_or(0).min(len - 1);
      self.channel_state.select(Some(i));
    }
  }

  pub fn add_channel(&mut self, text: &str) {
    let new = match parse_add_input(text) {
      Ok(new) => new,
      Err(e) => {
        self.set_error(e);
        return;
      }
    };
    let result = self.dashboard.add_channel(new);
    let Some(reservation) = self.report(result) else { return };
    self.set_info(format!("Added {}", reservation.channel.name));
    let len = self.dashboard.registry().len();
    self.channel_state.select(Some(len.saturating_sub(1)));
    if let Some(request) = reservation.lookup {
      self.spawn_lookup(request);
    }
  }

  /// Run a display-name lookup in the background. Without a key the answer
  /// is known up front and applied at once.
  fn spawn_lookup(&mut self, request: NameRequest) {
    if !self.client.has_key() {
      self.dashboard.complete_name_lookup(&request.id, Err(LookupError::Unavailable));
      return;
    }
    let client = self.client.clone();
    let tx = self.tasks.lookup_tx.clone();
    tokio::spawn(async move {
      let result = client.lookup_name(&request.id, request.kind).await;
      let _ = tx.send((request.id, result));
    });
  }

  pub fn assign_selected_channel(&mut self) {
    let Some(id) = self.selected_channel().map(|c| c.id.clone()) else { return };
    let result = self.dashboard.assign_channel(&id);
    if let Some(cell) = self.report(result) {
      self.cursor_to(&cell);
      self.set_info(format!("Assigned to {}", cell));
    }
  }

  pub fn remove_channel(&mut self, id: &str) {
    let result = self.dashboard.remove_channel(id);
    if let Some(removed) = self.report(result) {
      self.set_info(format!("Removed {}", removed.name));
    }
    self.clamp_channel_selection();
  }

  pub fn rename_channel(&mut self, id: &str, name: &str) {
    let result = self.dashboard.rename_channel(id, name);
    self.report(result);
  }

  pub fn confirm(&mut self, action: Confirm) {
    match action {
      Confirm::RemoveChannel(id) => self.remove_channel(&id),
      Confirm::ResetAll => self.reset_all(),
    }
  }

  // --- Search ---

  pub fn trigger_search(&mut self, term: &str) {
    self.tasks.search_rx = None;
    let Some(generation) = self.search.begin(term) else {
      self.set_error("Enter a search term.".to_string());
      return;
    };
    let term = self.search.term().to_string();
    if !self.client.has_key() {
      self.search.complete(generation, Err("Search needs a YouTube API key (--api-key or YOUTUBE_API_KEY)".into()));
      if let Some(e) = self.search.error() {
        self.set_error(e.to_string());
      }
      return;
    }
    info!(term = %term, "search triggered");
    self.clear_error();
    self.status_message = Some(format!("Searching '{}'…", term));
    let client = self.client.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(client.search(&term).await);
    });
    self.tasks.search_rx = Some((generation, rx));
  }

  pub fn selected_result(&self) -> Option<&SearchItem> {
    self.results_state.selected().and_then(|i| self.search.get(i))
  }

  pub fn assign_selected_result(&mut self) {
    let Some(item) = self.selected_result().cloned() else { return };
    let result = self.dashboard.assign_result_to_grid(&item);
    if let Some(assignment) = self.report(result) {
      self.cursor_to(&assignment.cell_id);
      let verb = if assignment.added { "Saved and assigned" } else { "Assigned" };
      self.set_info(format!("{} '{}' to {}", verb, item.title, assignment.cell_id));
    }
  }

  pub fn clear_search(&mut self) {
    self.search.clear();
    self.tasks.search_rx = None;
    self.status_message = None;
    self.results_state.select(None);
  }

  // --- Browser ---

  pub fn open_in_browser(&mut self) {
    let Some(channel) = self.cursor_channel() else {
      self.set_error("Nothing to open in this cell".to_string());
      return;
    };
    let url = reference::watch_url(channel.kind, &channel.id);
    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => {
        warn!(url = %url, err = %e, "app: failed to open browser");
        self.set_error(format!("Failed to open browser: {}", e));
      }
    }
  }

  // --- Background results ---

  pub fn check_pending(&mut self) {
    if let Some((generation, mut rx)) = self.tasks.search_rx.take() {
      let outcome = match rx.try_recv() {
        Ok(result) => Some(result.map_err(|e| format!("Search failed: {:#}", e))),
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.search_rx = Some((generation, rx));
          None
        }
        Err(oneshot::error::TryRecvError::Closed) => Some(Err("Search task failed.".to_string())),
      };
      if let Some(result) = outcome {
        self.apply_search(generation, result);
      }
    }

    while let Ok((id, result)) = self.tasks.lookup_rx.try_recv() {
      if let Err(e) = &result {
        debug!(id = %id, err = %e, "lookup: keeping placeholder name");
      }
      self.dashboard.complete_name_lookup(&id, result);
    }
  }

  fn apply_search(&mut self, generation: u64, result: Result<Vec<SearchItem>, String>) {
    if !self.search.complete(generation, result) {
      return;
    }
    self.status_message = None;
    if let Some(e) = self.search.error() {
      self.set_error(e.to_string());
      self.results_state.select(None);
    } else {
      self.results_state.select(Some(0));
      self.mode = AppMode::Results;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::persistence::MemoryStore;
  use crate::youtube::SearchKind;

  fn app() -> App<MemoryStore> {
    App::new(Dashboard::open(MemoryStore::default()), YouTubeClient::new(None), Config::default())
  }

  fn cell(id: &str, x: u32, y: u32, w: u32, h: u32) -> LayoutCell {
    LayoutCell { id: id.to_string(), x, y, w, h }
  }

  // --- Quality ---

  #[test]
  fn quality_from_config() {
    assert_eq!(Quality::from_config("HD720"), Quality::Hd720);
    assert_eq!(Quality::from_config("highres"), Quality::Highres);
    assert_eq!(Quality::from_config("ultra"), Quality::Auto);
  }

  #[test]
  fn quality_steps_wrap() {
    assert_eq!(Quality::Highres.step(true), Quality::Auto);
    assert_eq!(Quality::Auto.step(false), Quality::Highres);
    assert_eq!(Quality::Small.step(true), Quality::Medium);
  }

  #[test]
  fn player_defaults_and_embed_params() {
    let mut app = app();
    assert_eq!(app.player, PlayerControls { muted: false, playing: true, quality: Quality::Auto });
    app.toggle_mute();
    app.toggle_play();
    assert_eq!(app.player.embed_params(), "autoplay=0&mute=1&vq=auto");
  }

  // --- layout helpers ---

  #[test]
  fn fits_rejects_bounds_and_collisions() {
    let layout = vec![cell("cell-0", 0, 0, 2, 1), cell("cell-1", 2, 0, 2, 1)];
    assert!(fits(&layout, 0, &cell("cell-0", 0, 1, 2, 1), 4, 2));
    assert!(!fits(&layout, 0, &cell("cell-0", 1, 0, 2, 1), 4, 2));
    assert!(!fits(&layout, 1, &cell("cell-1", 3, 0, 2, 1), 4, 2));
    assert!(!fits(&layout, 0, &cell("cell-0", 0, 1, 2, 2), 4, 2));
    assert!(!fits(&layout, 0, &cell("cell-0", 0, 0, 0, 1), 4, 2));
  }

  #[test]
  fn neighbor_follows_geometry() {
    let layout =
      vec![cell("cell-0", 0, 0, 2, 1), cell("cell-1", 2, 0, 2, 1), cell("cell-2", 0, 1, 2, 1), cell("cell-3", 2, 1, 2, 1)];
    assert_eq!(neighbor(&layout, 0, Direction::Right), Some(1));
    assert_eq!(neighbor(&layout, 0, Direction::Down), Some(2));
    assert_eq!(neighbor(&layout, 3, Direction::Up), Some(1));
    assert_eq!(neighbor(&layout, 3, Direction::Left), Some(2));
    assert_eq!(neighbor(&layout, 0, Direction::Left), None);
    assert_eq!(neighbor(&layout, 9, Direction::Left), None);
  }

  // --- cursor and cell editing ---

  #[test]
  fn nudge_into_free_space_is_applied() {
    let mut app = app();
    app.remove_cursor_cell_at("cell-3");
    app.cursor = 1;
    app.nudge_cell(Direction::Down);
    assert_eq!(app.dashboard.grid().cell("cell-1"), Some(&cell("cell-1", 2, 1, 2, 1)));
    assert_eq!(app.last_error, None);
  }

  #[test]
  fn colliding_or_out_of_bounds_moves_are_rejected() {
    let mut app = app();
    let before = app.dashboard.grid().layout().to_vec();
    app.cursor = 0;
    app.nudge_cell(Direction::Right);
    app.nudge_cell(Direction::Left);
    app.nudge_cell(Direction::Up);
    app.resize_cell(1, 0);
    app.resize_cell(-2, 0);
    assert_eq!(app.dashboard.grid().layout(), before.as_slice());
    assert_eq!(app.last_error.as_deref(), Some("Cell can't go there"));
  }

  #[test]
  fn shrink_then_grow_cell() {
    let mut app = app();
    app.cursor = 0;
    app.resize_cell(-1, 0);
    assert_eq!(app.dashboard.grid().cell("cell-0").map(|c| c.w), Some(1));
    app.resize_cell(1, 0);
    assert_eq!(app.dashboard.grid().cell("cell-0").map(|c| c.w), Some(2));
  }

  #[test]
  fn toggle_select_on_cursor_cell() {
    let mut app = app();
    app.cursor = 2;
    app.toggle_select();
    assert_eq!(app.dashboard.grid().selected(), Some("cell-2"));
    app.toggle_select();
    assert_eq!(app.dashboard.grid().selected(), None);
  }

  #[test]
  fn columns_cycle_through_presets() {
    let mut app = app();
    app.cursor = 3;
    app.step_columns(true);
    assert_eq!(app.dashboard.grid().cols(), 6);
    app.step_columns(false);
    app.step_columns(false);
    assert_eq!(app.dashboard.grid().cols(), 12);
    app.step_columns(true);
    assert_eq!(app.dashboard.grid().cols(), 4);
  }

  #[test]
  fn cursor_stays_in_layout_after_removal() {
    let mut app = app();
    app.cursor = 3;
    app.remove_cursor_cell();
    assert_eq!(app.cursor, 2);
    assert!(app.cursor_cell().is_some());
  }

  // --- channels ---

  #[test]
  fn add_without_key_keeps_placeholder_and_settles() {
    let mut app = app();
    app.add_channel("https://youtu.be/abcDEF12345");
    let registry = app.dashboard.registry();
    assert_eq!(registry.get("abcDEF12345").map(|c| c.name.as_str()), Some("abcDEF12345"));
    assert!(!registry.is_pending("abcDEF12345"));
    assert_eq!(app.selected_channel().map(|c| c.id.as_str()), Some("abcDEF12345"));
  }

  #[test]
  fn add_input_takes_optional_name_and_kind() {
    let new = parse_add_input(" https://youtu.be/abcDEF12345 | Study beats | Live ").unwrap();
    assert_eq!(new.url, "https://youtu.be/abcDEF12345");
    assert_eq!(new.name.as_deref(), Some("Study beats"));
    assert_eq!(new.kind, Some(ContentKind::Live));

    let new = parse_add_input("abcDEF12345 |  | playlist").unwrap();
    assert_eq!((new.name, new.kind), (None, Some(ContentKind::Playlist)));
    assert!(parse_add_input("abcDEF12345 | x | short").is_err());
    assert!(parse_add_input("abcDEF12345 | x | live | extra").is_err());
  }

  #[test]
  fn add_with_name_and_kind_skips_lookup() {
    let mut app = app();
    app.add_channel("abcDEF12345 | Study beats | live");
    let channel = app.dashboard.registry().get("abcDEF12345").unwrap();
    assert_eq!((channel.name.as_str(), channel.kind), ("Study beats", ContentKind::Live));
    assert_eq!(app.info_message.as_deref(), Some("Added Study beats"));

    app.add_channel("defGHI67890 | | podcast");
    assert_eq!(app.last_error.as_deref(), Some("unknown kind 'podcast'"));
    assert!(!app.dashboard.registry().contains("defGHI67890"));
  }

  #[test]
  fn invalid_add_is_reported() {
    let mut app = app();
    app.add_channel("https://vimeo.com/123");
    assert!(app.last_error.as_deref().is_some_and(|e| e.starts_with("invalid YouTube URL")));
  }

  #[test]
  fn late_lookup_result_is_applied_on_poll() {
    let mut app = app();
    app.dashboard.add_channel(NewChannel::from_url("abcDEF12345")).unwrap();
    app.tasks.lookup_tx.send(("abcDEF12345".into(), Ok("Resolved".into()))).unwrap();
    app.tasks.lookup_tx.send(("gone".into(), Ok("ignored".into()))).unwrap();
    app.check_pending();
    assert_eq!(app.dashboard.registry().get("abcDEF12345").map(|c| c.name.as_str()), Some("Resolved"));
  }

  #[test]
  fn assign_from_side_list_moves_cursor() {
    let mut app = app();
    app.add_channel("abcDEF12345");
    app.assign_selected_channel();
    assert_eq!(app.dashboard.grid().content_of("cell-2"), Some("abcDEF12345"));
    assert_eq!(app.cursor_cell().map(|c| c.id.as_str()), Some("cell-2"));
  }

  #[test]
  fn confirm_remove_clears_cells() {
    let mut app = app();
    let id = app.dashboard.grid().content_of("cell-0").unwrap().to_string();
    app.confirm(Confirm::RemoveChannel(id.clone()));
    assert!(!app.dashboard.registry().contains(&id));
    assert_eq!(app.dashboard.grid().content_of("cell-0"), None);
    assert_eq!(app.channel_state.selected(), Some(0));
  }

  // --- search ---

  #[test]
  fn search_without_key_reports_error() {
    let mut app = app();
    app.trigger_search("lofi");
    assert!(app.last_error.as_deref().is_some_and(|e| e.contains("API key")));
    assert!(!app.search.is_loading());
  }

  #[test]
  fn search_results_switch_to_results_mode() {
    let mut app = app();
    let generation = app.search.begin("lofi").unwrap();
    let item = SearchItem { id: "abcDEF12345".into(), title: "Lofi".into(), thumbnail: None, kind: SearchKind::Video };
    app.apply_search(generation, Ok(vec![item]));
    assert_eq!(app.mode, AppMode::Results);
    app.assign_selected_result();
    assert_eq!(app.dashboard.grid().content_of("cell-2"), Some("abcDEF12345"));
    assert_eq!(app.info_message.as_deref(), Some("Saved and assigned 'Lofi' to cell-2"));
  }

  #[test]
  fn stale_search_is_ignored() {
    let mut app = app();
    let old = app.search.begin("a").unwrap();
    app.search.begin("b").unwrap();
    app.apply_search(old, Ok(Vec::new()));
    assert_eq!(app.mode, AppMode::Grid);
    assert_eq!(app.last_error, None);
  }

  // --- notifications ---

  #[test]
  fn notifications_replace_each_other() {
    let mut app = app();
    app.set_error("bad".into());
    app.set_info("good".into());
    assert_eq!(app.last_error, None);
    assert_eq!(app.info_message.as_deref(), Some("good"));
    app.expire_notifications();
    assert_eq!(app.info_message.as_deref(), Some("good"));
  }

  impl App<MemoryStore> {
    fn remove_cursor_cell_at(&mut self, id: &str) {
      self.dashboard.remove_cell(id).unwrap();
      self.clamp_cursor();
    }
  }
}
