use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppMode, Confirm, Direction, InputPurpose, SettingsRow};
use crate::persistence::SnapshotStore;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Apply a line-editing key to `text`. Returns `false` for keys it doesn't
/// handle.
fn edit_text(text: &mut String, cursor: &mut usize, code: KeyCode) -> bool {
  match code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(text, *cursor);
      text.insert(byte_idx, c);
      *cursor += 1;
    }
    KeyCode::Backspace => {
      if *cursor > 0 {
        *cursor -= 1;
        let byte_idx = char_to_byte_index(text, *cursor);
        text.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if *cursor < text.chars().count() {
        let byte_idx = char_to_byte_index(text, *cursor);
        text.remove(byte_idx);
      }
    }
    KeyCode::Left => *cursor = cursor.saturating_sub(1),
    KeyCode::Right => {
      if *cursor < text.chars().count() {
        *cursor += 1;
      }
    }
    KeyCode::Home => *cursor = 0,
    KeyCode::End => *cursor = text.chars().count(),
    _ => return false,
  }
  true
}

/// Move a list selection by one, wrapping at both ends.
fn step_list(selected: Option<usize>, count: usize, forward: bool) -> Option<usize> {
  if count == 0 {
    return None;
  }
  Some(match selected {
    None => 0,
    Some(i) if forward => (i + 1) % count,
    Some(0) => count - 1,
    Some(i) => i - 1,
  })
}

fn begin_input<S: SnapshotStore>(app: &mut App<S>, purpose: InputPurpose, initial: &str) {
  app.input = initial.to_string();
  app.cursor_position = app.input.chars().count();
  app.input_scroll = 0;
  app.mode = AppMode::Input(purpose);
}

// --- Event Handling ---

pub fn handle_key_event<S: SnapshotStore>(app: &mut App<S>, key: KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  match app.mode.clone() {
    AppMode::Grid => handle_grid_key(app, key),
    AppMode::Channels => handle_channels_key(app, key),
    AppMode::Results => handle_results_key(app, key),
    AppMode::Input(purpose) => handle_input_key(app, key, purpose),
    AppMode::Settings => handle_settings_key(app, key),
    AppMode::Confirm(action) => handle_confirm_key(app, key, action),
  }
}

/// Keys available from every pane, for controls that don't depend on it.
fn handle_common_key<S: SnapshotStore>(app: &mut App<S>, code: KeyCode) -> bool {
  match code {
    KeyCode::Char('a') => begin_input(app, InputPurpose::AddChannel, ""),
    KeyCode::Char('/') => {
      let term = app.search.term().to_string();
      begin_input(app, InputPurpose::Search, &term);
    }
    KeyCode::Char('m') => app.toggle_mute(),
    KeyCode::Char('p') => app.toggle_play(),
    KeyCode::Char('s') => app.mode = AppMode::Settings,
    KeyCode::Char('b') => app.toggle_channel_list(),
    KeyCode::Char('t') => app.toggle_chat(),
    KeyCode::Char('q') => app.should_quit = true,
    KeyCode::Tab => app.mode = next_pane(app),
    _ => return false,
  }
  true
}

fn next_pane<S: SnapshotStore>(app: &App<S>) -> AppMode {
  let has_results = !app.search.results().is_empty();
  match app.mode {
    AppMode::Grid if app.channel_list_visible => AppMode::Channels,
    AppMode::Grid | AppMode::Channels if has_results => AppMode::Results,
    _ => AppMode::Grid,
  }
}

fn handle_grid_key<S: SnapshotStore>(app: &mut App<S>, key: KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Left | KeyCode::Char('h') => app.move_cursor(Direction::Left),
    KeyCode::Right | KeyCode::Char('l') => app.move_cursor(Direction::Right),
    KeyCode::Up | KeyCode::Char('k') => app.move_cursor(Direction::Up),
    KeyCode::Down | KeyCode::Char('j') => app.move_cursor(Direction::Down),
    KeyCode::Char('H') => app.nudge_cell(Direction::Left),
    KeyCode::Char('L') => app.nudge_cell(Direction::Right),
    KeyCode::Char('K') => app.nudge_cell(Direction::Up),
    KeyCode::Char('J') => app.nudge_cell(Direction::Down),
    KeyCode::Char('>') => app.resize_cell(1, 0),
    KeyCode::Char('<') => app.resize_cell(-1, 0),
    KeyCode::Char('+') | KeyCode::Char('=') => app.resize_cell(0, 1),
    KeyCode::Char('-') => app.resize_cell(0, -1),
    KeyCode::Enter | KeyCode::Char(' ') => app.toggle_select(),
    KeyCode::Char(']') => app.step_columns(true),
    KeyCode::Char('[') => app.step_columns(false),
    KeyCode::Char('n') => app.add_cell(),
    KeyCode::Char('x') => app.remove_cursor_cell(),
    KeyCode::Char('c') => app.clear_cursor_cell(),
    KeyCode::Char('R') => app.reset_layout(),
    KeyCode::Char('o') => app.open_in_browser(),
    KeyCode::Esc => {
      let _ = app.dashboard.select_cell(None);
    }
    code => {
      handle_common_key(app, code);
    }
  }
}

fn handle_channels_key<S: SnapshotStore>(app: &mut App<S>, key: KeyEvent) {
  app.clear_error();
  let count = app.dashboard.registry().len();
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => {
      let i = step_list(app.channel_state.selected(), count, true);
      app.channel_state.select(i);
    }
    KeyCode::Up | KeyCode::Char('k') => {
      let i = step_list(app.channel_state.selected(), count, false);
      app.channel_state.select(i);
    }
    KeyCode::Enter => app.assign_selected_channel(),
    KeyCode::Char('d') | KeyCode::Delete => {
      if let Some(id) = app.selected_channel().map(|c| c.id.clone()) {
        app.mode = AppMode::Confirm(Confirm::RemoveChannel(id));
      }
    }
    KeyCode::Char('r') => {
      if let Some((id, name)) = app.selected_channel().map(|c| (c.id.clone(), c.name.clone())) {
        begin_input(app, InputPurpose::Rename(id), &name);
      }
    }
    KeyCode::Esc => app.mode = AppMode::Grid,
    code => {
      handle_common_key(app, code);
    }
  }
}

fn handle_results_key<S: SnapshotStore>(app: &mut App<S>, key: KeyEvent) {
  app.clear_error();
  let count = app.search.results().len();
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => {
      let i = step_list(app.results_state.selected(), count, true);
      app.results_state.select(i);
    }
    KeyCode::Up | KeyCode::Char('k') => {
      let i = step_list(app.results_state.selected(), count, false);
      app.results_state.select(i);
    }
    KeyCode::Enter => app.assign_selected_result(),
    KeyCode::Char('c') => {
      app.clear_search();
      app.mode = AppMode::Grid;
    }
    KeyCode::Esc => app.mode = AppMode::Grid,
    code => {
      handle_common_key(app, code);
    }
  }
}

fn handle_input_key<S: SnapshotStore>(app: &mut App<S>, key: KeyEvent, purpose: InputPurpose) {
  app.clear_error();
  let back = match purpose {
    InputPurpose::Rename(_) => AppMode::Channels,
    InputPurpose::AddChannel if app.channel_list_visible => AppMode::Channels,
    _ => AppMode::Grid,
  };
  match key.code {
    KeyCode::Enter => {
      let text = std::mem::take(&mut app.input);
      app.cursor_position = 0;
      app.input_scroll = 0;
      app.mode = back;
      match purpose {
        InputPurpose::AddChannel => app.add_channel(&text),
        InputPurpose::Search => app.trigger_search(&text),
        InputPurpose::Rename(id) => app.rename_channel(&id, &text),
      }
    }
    KeyCode::Esc => {
      app.input.clear();
      app.cursor_position = 0;
      app.input_scroll = 0;
      app.mode = back;
    }
    code => {
      edit_text(&mut app.input, &mut app.cursor_position, code);
    }
  }
}

fn handle_settings_key<S: SnapshotStore>(app: &mut App<S>, key: KeyEvent) {
  let rows = SettingsRow::ALL.len();
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => app.settings_index = (app.settings_index + 1) % rows,
    KeyCode::Up | KeyCode::Char('k') => app.settings_index = (app.settings_index + rows - 1) % rows,
    KeyCode::Left | KeyCode::Char('h') => adjust_setting(app, false),
    KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter => adjust_setting(app, true),
    KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('q') => app.mode = AppMode::Grid,
    _ => {}
  }
}

fn adjust_setting<S: SnapshotStore>(app: &mut App<S>, forward: bool) {
  match SettingsRow::ALL.get(app.settings_index) {
    Some(SettingsRow::Quality) => app.step_quality(forward),
    Some(SettingsRow::Columns) => app.step_columns(forward),
    Some(SettingsRow::Theme) => app.next_theme(),
    Some(SettingsRow::ApiKey) => app.set_info("The API key is read from --api-key or YOUTUBE_API_KEY".to_string()),
    Some(SettingsRow::Reset) => app.mode = AppMode::Confirm(Confirm::ResetAll),
    None => {}
  }
}

fn handle_confirm_key<S: SnapshotStore>(app: &mut App<S>, key: KeyEvent, action: Confirm) {
  let back = match action {
    Confirm::RemoveChannel(_) => AppMode::Channels,
    Confirm::ResetAll => AppMode::Settings,
  };
  match key.code {
    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
      app.mode = if action == Confirm::ResetAll { AppMode::Grid } else { back };
      app.confirm(action);
    }
    _ => app.mode = back,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::dashboard::Dashboard;
  use crate::persistence::MemoryStore;
  use crate::youtube::YouTubeClient;

  fn app() -> App<MemoryStore> {
    App::new(Dashboard::open(MemoryStore::default()), YouTubeClient::new(None), Config::default())
  }

  fn press(app: &mut App<MemoryStore>, code: KeyCode) {
    handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
  }

  fn type_str(app: &mut App<MemoryStore>, s: &str) {
    for c in s.chars() {
      press(app, KeyCode::Char(c));
    }
  }

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }

  // --- editing ---

  #[test]
  fn edit_text_inserts_at_cursor() {
    let mut text = "ac".to_string();
    let mut cursor = 1;
    edit_text(&mut text, &mut cursor, KeyCode::Char('b'));
    assert_eq!((text.as_str(), cursor), ("abc", 2));
    edit_text(&mut text, &mut cursor, KeyCode::Home);
    edit_text(&mut text, &mut cursor, KeyCode::Delete);
    assert_eq!(text, "bc");
    assert!(!edit_text(&mut text, &mut cursor, KeyCode::F(1)));
  }

  #[test]
  fn step_list_wraps() {
    assert_eq!(step_list(None, 0, true), None);
    assert_eq!(step_list(Some(2), 3, true), Some(0));
    assert_eq!(step_list(Some(0), 3, false), Some(2));
  }

  // --- dispatch ---

  #[test]
  fn add_channel_through_input() {
    let mut app = app();
    press(&mut app, KeyCode::Char('a'));
    assert_eq!(app.mode, AppMode::Input(InputPurpose::AddChannel));
    type_str(&mut app, "youtu.be/abcDEF12345");
    press(&mut app, KeyCode::Enter);
    assert!(app.dashboard.registry().contains("abcDEF12345"));
    assert_eq!(app.mode, AppMode::Channels);
    assert!(app.input.is_empty());
  }

  #[test]
  fn escape_cancels_input() {
    let mut app = app();
    press(&mut app, KeyCode::Char('/'));
    type_str(&mut app, "lofi");
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.mode, AppMode::Grid);
    assert!(app.input.is_empty());
    assert_eq!(app.search.term(), "");
  }

  #[test]
  fn rename_from_side_list() {
    let mut app = app();
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.mode, AppMode::Channels);
    press(&mut app, KeyCode::Char('r'));
    for _ in 0..40 {
      press(&mut app, KeyCode::Backspace);
    }
    type_str(&mut app, "Study beats");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.dashboard.registry().channels()[0].name, "Study beats");
    assert_eq!(app.mode, AppMode::Channels);
  }

  #[test]
  fn remove_channel_needs_confirmation() {
    let mut app = app();
    let first = app.dashboard.registry().channels()[0].id.clone();
    app.mode = AppMode::Channels;
    press(&mut app, KeyCode::Char('d'));
    press(&mut app, KeyCode::Char('n'));
    assert!(app.dashboard.registry().contains(&first));
    press(&mut app, KeyCode::Char('d'));
    press(&mut app, KeyCode::Char('y'));
    assert!(!app.dashboard.registry().contains(&first));
    assert_eq!(app.mode, AppMode::Channels);
  }

  #[test]
  fn grid_keys_drive_cells() {
    let mut app = app();
    press(&mut app, KeyCode::Char('l'));
    press(&mut app, KeyCode::Char('j'));
    assert_eq!(app.cursor_cell().map(|c| c.id.as_str()), Some("cell-3"));
    press(&mut app, KeyCode::Char(' '));
    assert_eq!(app.dashboard.grid().selected(), Some("cell-3"));
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.dashboard.grid().selected(), None);
    press(&mut app, KeyCode::Char(']'));
    assert_eq!(app.dashboard.grid().cols(), 6);
  }

  #[test]
  fn settings_adjust_quality() {
    let mut app = app();
    app.mode = AppMode::Settings;
    app.settings_index = 0;
    app.player.quality = crate::app::Quality::Hd1080;
    // Quality row cycles without touching the grid.
    adjust_setting(&mut app, false);
    assert_eq!(app.player.quality, crate::app::Quality::Hd720);
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.mode, AppMode::Grid);
  }

  #[test]
  fn ctrl_c_quits_from_any_mode() {
    let mut app = app();
    app.mode = AppMode::Input(InputPurpose::Search);
    handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }
}
