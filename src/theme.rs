use ratatui::style::Color;

use crate::models::CefrLevel;

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
  pub beginner: Color,
  pub intermediate: Color,
  pub advanced: Color,
}

impl Theme {
  /// Badge colour for a CEFR level, grouped by band.
  pub fn level_color(&self, level: Option<CefrLevel>) -> Color {
    match level.map(CefrLevel::band) {
      Some('A') => self.beginner,
      Some('B') => self.intermediate,
      Some('C') => self.advanced,
      _ => self.muted,
    }
  }
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Indigo",
    bg: Color::Rgb(22, 22, 38),
    fg: Color::Rgb(226, 228, 240),
    accent: Color::Rgb(129, 140, 248),
    muted: Color::Rgb(120, 124, 150),
    border: Color::Rgb(60, 62, 92),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(67, 56, 202),
    stripe_bg: Color::Rgb(28, 28, 48),
    status: Color::Rgb(251, 191, 36),
    error: Color::Rgb(244, 63, 94),
    key_fg: Color::Rgb(22, 22, 38),
    key_bg: Color::Rgb(129, 140, 248),
    beginner: Color::Rgb(74, 222, 128),
    intermediate: Color::Rgb(251, 191, 36),
    advanced: Color::Rgb(251, 113, 133),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(248, 250, 252),
    fg: Color::Rgb(30, 41, 59),
    accent: Color::Rgb(79, 70, 229),
    muted: Color::Rgb(100, 116, 139),
    border: Color::Rgb(203, 213, 225),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(79, 70, 229),
    stripe_bg: Color::Rgb(241, 245, 249),
    status: Color::Rgb(180, 83, 9),
    error: Color::Rgb(225, 29, 72),
    key_fg: Color::Rgb(255, 255, 255),
    key_bg: Color::Rgb(71, 85, 105),
    beginner: Color::Rgb(21, 128, 61),
    intermediate: Color::Rgb(180, 83, 9),
    advanced: Color::Rgb(190, 18, 60),
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
    status: Color::Yellow,
    error: Color::Red,
    key_fg: Color::Black,
    key_bg: Color::Gray,
    beginner: Color::Green,
    intermediate: Color::Yellow,
    advanced: Color::Red,
  },
];
