use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
  /// Border of the selected (assignment target) cell.
  pub selected: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Pastel",
    bg: Color::Rgb(30, 30, 46),
    fg: Color::Rgb(205, 214, 244),
    accent: Color::Rgb(245, 194, 231),
    muted: Color::Rgb(127, 132, 156),
    border: Color::Rgb(69, 71, 90),
    highlight_fg: Color::Rgb(30, 30, 46),
    highlight_bg: Color::Rgb(180, 190, 254),
    stripe_bg: Color::Rgb(36, 36, 54),
    status: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    key_fg: Color::Rgb(30, 30, 46),
    key_bg: Color::Rgb(137, 180, 250),
    selected: Color::Rgb(249, 226, 175),
  },
  Theme {
    name: "Nord",
    bg: Color::Rgb(46, 52, 64),
    fg: Color::Rgb(216, 222, 233),
    accent: Color::Rgb(136, 192, 208),
    muted: Color::Rgb(118, 128, 148),
    border: Color::Rgb(67, 76, 94),
    highlight_fg: Color::Rgb(46, 52, 64),
    highlight_bg: Color::Rgb(129, 161, 193),
    stripe_bg: Color::Rgb(52, 58, 72),
    status: Color::Rgb(163, 190, 140),
    error: Color::Rgb(191, 97, 106),
    key_fg: Color::Rgb(46, 52, 64),
    key_bg: Color::Rgb(94, 129, 172),
    selected: Color::Rgb(235, 203, 139),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Green,
    error: Color::Red,
    key_fg: Color::Black,
    key_bg: Color::Blue,
    selected: Color::Yellow,
  },
];

pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn theme_lookup_by_name() {
    assert_eq!(theme_index(Some("nord")), 1);
    assert_eq!(theme_index(Some("unknown")), 0);
    assert_eq!(theme_index(None), 0);
  }
}
