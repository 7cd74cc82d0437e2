use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, Clear, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode, Confirm, InputPurpose, SettingsRow};
use crate::constants::constants;
use crate::grid::LayoutCell;
use crate::persistence::SnapshotStore;
use crate::reference;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Screen rectangle of a layout cell inside `area`, which spans `cols` x
/// `rows` grid units. Parts beyond the column band are clipped; `None` when
/// nothing is left to draw.
pub fn cell_rect(area: Rect, cell: &LayoutCell, cols: u32, rows: u32) -> Option<Rect> {
  let (cols, rows) = (cols.max(1) as u64, rows.max(1) as u64);
  let (aw, ah) = (area.width as u64, area.height as u64);
  let x0 = area.x as u64 + (cell.x as u64).min(cols) * aw / cols;
  let x1 = area.x as u64 + (cell.right() as u64).min(cols) * aw / cols;
  let y0 = area.y as u64 + (cell.y as u64).min(rows) * ah / rows;
  let y1 = area.y as u64 + (cell.bottom() as u64).min(rows) * ah / rows;
  if x1 <= x0 || y1 <= y0 {
    return None;
  }
  Some(Rect::new(x0 as u16, y0 as u16, (x1 - x0) as u16, (y1 - y0) as u16))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect { x: area.x + (area.width - width) / 2, y: area.y + (area.height - height) / 2, width, height }
}

fn panel<'a>(title: impl Into<Line<'a>>, theme: &Theme, focused: bool) -> Block<'a> {
  let color = if focused { theme.accent } else { theme.border };
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(color))
}

// --- UI Rendering ---

pub fn ui<S: SnapshotStore>(frame: &mut Frame, app: &mut App<S>) {
  let theme = app.theme();
  let full = frame.area();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), full);

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(6),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(full);

  render_header(frame, app, header_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);

  match &app.mode {
    AppMode::Settings => render_settings(frame, app, full),
    AppMode::Confirm(action) => render_confirm(frame, app, action, full),
    _ => {}
  }
}

fn render_header<S: SnapshotStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
  let theme = app.theme();
  let mut spans = vec![Span::styled(" ▦ ytgrid ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  let player = &app.player;
  spans.push(Span::styled(if player.playing { " ▶ playing " } else { " ⏸ paused " }, Style::default().fg(theme.fg)));
  if player.muted {
    spans.push(Span::styled(" muted ", Style::default().fg(theme.error)));
  }
  spans.push(Span::styled(format!(" quality {} ", player.quality.label()), Style::default().fg(theme.muted)));
  frame.render_widget(Line::from(spans), area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_main<S: SnapshotStore>(frame: &mut Frame, app: &mut App<S>, area: Rect) {
  let mut constraints = Vec::new();
  if app.channel_list_visible {
    constraints.push(Constraint::Length(32));
  }
  constraints.push(Constraint::Min(20));
  if app.chat_visible {
    constraints.push(Constraint::Length(36));
  }
  let areas = Layout::horizontal(constraints).split(area);
  let mut areas = areas.iter().copied();

  if app.channel_list_visible
    && let Some(list_area) = areas.next()
  {
    render_channels(frame, app, list_area);
  }
  let Some(center) = areas.next() else { return };
  let show_results = app.search.is_loading() || !app.search.results().is_empty();
  if show_results {
    let [grid_area, results_area] =
      Layout::vertical([Constraint::Percentage(62), Constraint::Percentage(38)]).areas(center);
    render_grid(frame, app, grid_area);
    render_results(frame, app, results_area);
  } else {
    render_grid(frame, app, center);
  }
  if app.chat_visible
    && let Some(chat_area) = areas.next()
  {
    render_chat(frame, app, chat_area);
  }
}

fn render_grid<S: SnapshotStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
  let theme = app.theme();
  let grid = app.dashboard.grid();
  let title = Line::from(vec![
    Span::raw(" Grid "),
    Span::styled(format!("{} cols ", grid.cols()), Style::default().fg(theme.muted)),
  ]);
  let block = panel(title, theme, app.mode == AppMode::Grid);
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let rows = (grid.config().row_count as u32).max(grid.rows_spanned());
  let params = app.player.embed_params();
  for (idx, cell) in grid.layout().iter().enumerate() {
    let Some(rect) = cell_rect(inner, cell, grid.cols(), rows) else { continue };
    let is_cursor = idx == app.cursor;
    let is_selected = grid.selected() == Some(cell.id.as_str());
    let border = if is_selected {
      theme.selected
    } else if is_cursor {
      theme.accent
    } else {
      theme.border
    };
    let mut title = vec![Span::styled(format!(" {} ", cell.id), Style::default().fg(border))];
    if is_selected {
      title.push(Span::styled("● target ", Style::default().fg(theme.selected)));
    }
    let block = Block::bordered()
      .title(Line::from(title))
      .border_type(if is_cursor { ratatui::widgets::BorderType::Thick } else { ratatui::widgets::BorderType::Rounded })
      .border_style(Style::default().fg(border))
      .padding(Padding::horizontal(1));

    let inner_w = rect.width.saturating_sub(4) as usize;
    let lines = match app.dashboard.channel_in(&cell.id) {
      Some(channel) => {
        let embed = reference::embed_url(channel.kind, &channel.id)
          .map(|url| format!("{}{}{}", url, if url.contains('?') { "&" } else { "?" }, params))
          .unwrap_or_else(|| "channel page (not embeddable)".to_string());
        vec![
          Line::from(Span::styled(
            truncate_str(&channel.name, inner_w),
            Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
          )),
          Line::from(Span::styled(channel.kind.label(), Style::default().fg(theme.muted))),
          Line::from(Span::styled(embed, Style::default().fg(theme.accent))),
        ]
      }
      None => vec![Line::from(Span::styled("empty", Style::default().fg(theme.muted)))],
    };
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block), rect);
  }
}

fn render_channels<S: SnapshotStore>(frame: &mut Frame, app: &mut App<S>, area: Rect) {
  let theme = app.theme();
  let registry = app.dashboard.registry();
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = registry
    .channels()
    .iter()
    .enumerate()
    .map(|(i, channel)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      let label = channel.kind.label();
      let pending = if registry.is_pending(&channel.id) { "…" } else { "" };
      let name = truncate_str(&format!("{}{}", channel.name, pending), inner_w.saturating_sub(label.len() + 1));
      let gap = inner_w.saturating_sub(name.chars().count() + label.len());
      ListItem::new(Line::from(vec![
        Span::styled(name, Style::default().fg(theme.fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(label, Style::default().fg(theme.muted)),
      ]))
      .bg(bg)
    })
    .collect();

  let title = format!(" Channels ({}) ", registry.len());
  let list = List::new(items)
    .block(panel(title, theme, app.mode == AppMode::Channels))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.channel_state);
}

fn render_results<S: SnapshotStore>(frame: &mut Frame, app: &mut App<S>, area: Rect) {
  let theme = app.theme();
  let inner_w = area.width.saturating_sub(4) as usize;
  let saved = app.dashboard.registry();

  let items: Vec<ListItem> = app
    .search
    .results()
    .iter()
    .enumerate()
    .map(|(i, item)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      let label = format!("{:<8}", item.kind.label());
      let mark = if saved.contains(&item.id) { " ✓" } else { "" };
      let title = truncate_str(&item.title, inner_w.saturating_sub(label.len() + mark.len()));
      ListItem::new(Line::from(vec![
        Span::styled(label, Style::default().fg(theme.muted)),
        Span::styled(title, Style::default().fg(theme.fg)),
        Span::styled(mark, Style::default().fg(theme.status)),
      ]))
      .bg(bg)
    })
    .collect();

  let title = if app.search.is_loading() {
    format!(" Searching '{}'… ", app.search.term())
  } else {
    format!(" Results for '{}' ", app.search.term())
  };
  let list = List::new(items)
    .block(panel(title, theme, app.mode == AppMode::Results))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.results_state);
}

fn render_chat<S: SnapshotStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
  let theme = app.theme();
  let block = panel(" Live chat ", theme, false).padding(Padding::horizontal(1));
  let text = match app.cursor_channel() {
    Some(channel) => match reference::chat_url(channel.kind, &channel.id, &constants().embed_domain) {
      Some(url) => vec![
        Line::from(Span::styled(channel.name.clone(), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(url, Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED))),
      ],
      None => vec![Line::from(Span::styled("No live chat for this content.", Style::default().fg(theme.muted)))],
    },
    None => vec![Line::from(Span::styled("Focus a cell with a stream to see its chat.", Style::default().fg(theme.muted)))],
  };
  frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }).block(block), area);
}

fn render_status<S: SnapshotStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.status))
  } else if app.mode == AppMode::Results
    && let Some(item) = app.selected_result()
  {
    let thumb = item.thumbnail.as_deref().unwrap_or("no thumbnail");
    (format!(" {} · {} · {}", item.kind.label(), item.id, thumb), Style::default().fg(theme.muted))
  } else {
    let target = match app.dashboard.grid().selected() {
      Some(cell) => format!(" · target {}", cell),
      None => String::new(),
    };
    (format!(" Ready · {} channels{}", app.dashboard.registry().len(), target), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input<S: SnapshotStore>(frame: &mut Frame, app: &mut App<S>, area: Rect) {
  let theme = app.theme();
  let (title, active) = match &app.mode {
    AppMode::Input(purpose) => (purpose.title(), true),
    _ => (" a: add channel  /: search ", false),
  };
  let border_color = if active { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if active {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_settings<S: SnapshotStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
  let theme = app.theme();
  let popup = centered(area, 54, 11);
  frame.render_widget(Clear, popup);

  let lines: Vec<Line> = SettingsRow::ALL
    .iter()
    .enumerate()
    .map(|(i, row)| {
      let (label, value) = match row {
        SettingsRow::Quality => ("Target quality", app.player.quality.label().to_string()),
        SettingsRow::Columns => ("Grid columns", app.dashboard.grid().cols().to_string()),
        SettingsRow::Theme => ("Theme", theme.name.to_string()),
        SettingsRow::ApiKey => {
          ("YouTube API key", if app.has_api_key() { "configured".to_string() } else { "not set".to_string() })
        }
        SettingsRow::Reset => ("Reset everything", "press Enter".to_string()),
      };
      let style = if i == app.settings_index {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg)
      } else {
        Style::default().fg(theme.fg)
      };
      Line::from(vec![Span::styled(format!(" {:<18}", label), style), Span::styled(format!("‹ {} ›", value), style)])
    })
    .collect();

  let block = panel(" Settings ", theme, true).padding(Padding::uniform(1)).bg(theme.bg);
  frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_confirm<S: SnapshotStore>(frame: &mut Frame, app: &App<S>, action: &Confirm, area: Rect) {
  let theme = app.theme();
  let message = match action {
    Confirm::RemoveChannel(id) => {
      let name = app.dashboard.registry().get(id).map_or(id.as_str(), |c| c.name.as_str());
      format!("Remove channel '{}'? It is cleared from every cell.", name)
    }
    Confirm::ResetAll => "Reset everything? All saved channels and the layout are replaced by the defaults.".to_string(),
  };
  let popup = centered(area, 50, 7);
  frame.render_widget(Clear, popup);
  let text = vec![
    Line::from(Span::styled(message, Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("y: confirm   any other key: cancel", Style::default().fg(theme.muted))),
  ];
  let block = panel(" Confirm ", theme, true).padding(Padding::horizontal(1)).bg(theme.bg);
  frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(block), popup);
}

fn render_footer<S: SnapshotStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match &app.mode {
    AppMode::Grid => vec![
      ("hjkl", "Move"),
      ("Space", "Select"),
      ("HJKL", "Shift"),
      ("<>+-", "Resize"),
      ("[ ]", "Columns"),
      ("n/x/c", "Cell"),
      ("R", "Reset"),
      ("m/p", if app.player.muted { "Unmute/Play" } else { "Mute/Play" }),
      ("o", "Open"),
      ("s", "Settings"),
      ("Tab", "Panes"),
    ],
    AppMode::Channels => {
      vec![("Enter", "Assign"), ("j/k", "Navigate"), ("r", "Rename"), ("d", "Remove"), ("a", "Add"), ("Esc", "Grid")]
    }
    AppMode::Results => vec![("Enter", "Assign"), ("j/k", "Navigate"), ("/", "Search"), ("c", "Clear"), ("Esc", "Grid")],
    AppMode::Input(InputPurpose::Search) => vec![("Enter", "Search"), ("Esc", "Cancel")],
    AppMode::Input(_) => vec![("Enter", "Save"), ("Esc", "Cancel")],
    AppMode::Settings => vec![("j/k", "Row"), ("←/→", "Change"), ("Esc", "Close")],
    AppMode::Confirm(_) => vec![("y", "Confirm"), ("any", "Cancel")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::dashboard::Dashboard;
  use crate::persistence::MemoryStore;
  use crate::youtube::YouTubeClient;
  use ratatui::{Terminal, backend::TestBackend};

  fn cell(x: u32, y: u32, w: u32, h: u32) -> LayoutCell {
    LayoutCell { id: "cell-0".into(), x, y, w, h }
  }

  // --- cell_rect ---

  #[test]
  fn cell_rect_scales_units() {
    let area = Rect::new(0, 0, 80, 20);
    assert_eq!(cell_rect(area, &cell(0, 0, 2, 1), 4, 2), Some(Rect::new(0, 0, 40, 10)));
    assert_eq!(cell_rect(area, &cell(2, 1, 2, 1), 4, 2), Some(Rect::new(40, 10, 40, 10)));
  }

  #[test]
  fn cell_rect_offsets_and_clips() {
    let area = Rect::new(5, 3, 60, 30);
    assert_eq!(cell_rect(area, &cell(1, 0, 1, 1), 3, 3), Some(Rect::new(25, 3, 20, 10)));
    assert_eq!(cell_rect(area, &cell(2, 0, 5, 1), 3, 3), Some(Rect::new(45, 3, 20, 10)));
    assert_eq!(cell_rect(area, &cell(3, 0, 1, 1), 3, 3), None);
    assert_eq!(cell_rect(Rect::new(0, 0, 0, 0), &cell(0, 0, 1, 1), 3, 3), None);
  }

  #[test]
  fn cell_rect_handles_extreme_units() {
    let area = Rect::new(0, 0, 100, 20);
    let wide = LayoutCell { id: "cell-0".into(), x: 0, y: 0, w: u32::MAX, h: u32::MAX };
    assert_eq!(cell_rect(area, &wide, u32::MAX, u32::MAX), Some(area));
    let far = LayoutCell { id: "cell-1".into(), x: u32::MAX, y: 0, w: u32::MAX, h: 1 };
    assert_eq!(cell_rect(area, &far, u32::MAX, 1), None);
  }

  // --- truncate_str / display_width ---

  #[test]
  fn truncate_adds_ellipsis() {
    assert_eq!(truncate_str("hello", 10), "hello");
    assert_eq!(truncate_str("hello world", 6), "hello…");
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("ab", 2), 2);
    assert_eq!(display_width("日本", 2), 4);
    assert_eq!(display_width("日本", 1), 2);
  }

  // --- full frame ---

  fn rendered(app: &mut App<MemoryStore>) -> String {
    let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
    terminal.draw(|frame| ui(frame, app)).unwrap();
    let buffer = terminal.backend().buffer();
    buffer.content().iter().map(|c| c.symbol()).collect()
  }

  #[test]
  fn frame_shows_cells_and_channels() {
    let mut app = App::new(Dashboard::open(MemoryStore::default()), YouTubeClient::new(None), Config::default());
    let screen = rendered(&mut app);
    assert!(screen.contains("cell-0"));
    assert!(screen.contains("cell-3"));
    assert!(screen.contains("Channels (2)"));
    assert!(screen.contains("empty"));
  }

  #[test]
  fn settings_popup_renders() {
    let mut app = App::new(Dashboard::open(MemoryStore::default()), YouTubeClient::new(None), Config::default());
    app.mode = AppMode::Settings;
    let screen = rendered(&mut app);
    assert!(screen.contains("Target quality"));
    assert!(screen.contains("not set"));
  }
}
