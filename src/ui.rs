use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{AdminField, App, AppMode};
use crate::controller::FetchPhase;
use crate::detail::{format_duration, format_timestamp, grammar_label, grammar_value};
use crate::filters::FilterKey;
use crate::models::VideoDetail;
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

fn panel<'a>(theme: &Theme, title: impl Into<Line<'a>>, focused: bool) -> Block<'a> {
  let color = if focused { theme.accent } else { theme.border };
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(color))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  match app.mode {
    AppMode::Detail => render_detail(frame, app, main_area),
    AppMode::Admin => render_admin(frame, app, main_area),
    AppMode::Browse | AppMode::Search | AppMode::Filters => {
      let [list_area, filter_area] =
        Layout::horizontal([Constraint::Percentage(68), Constraint::Percentage(32)]).areas(main_area);
      render_videos(frame, app, list_area);
      render_filters(frame, app, filter_area);
    }
  }
  render_status(frame, app, status_area);
  render_search(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(vec![
    Span::styled(" ◆ lingoreel ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(app.api.base_url().to_string(), Style::default().fg(theme.muted)),
  ]);
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_videos(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let videos = app.catalog.videos();

  let title = match app.catalog.phase() {
    FetchPhase::Loading => format!(" Library · {} videos (loading…) ", videos.len()),
    FetchPhase::Error => format!(" Library · {} videos (stale) ", videos.len()),
    _ => format!(" Library · {} videos ", videos.len()),
  };
  let block = panel(theme, title, app.mode == AppMode::Browse);

  if videos.is_empty() {
    let msg = if app.catalog.phase() == FetchPhase::Loading { "Loading…" } else { "No videos match these filters." };
    let paragraph = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(msg, Style::default().fg(theme.muted)))])
      .alignment(Alignment::Center)
      .block(block);
    frame.render_widget(paragraph, area);
    return;
  }

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = videos
    .iter()
    .enumerate()
    .map(|(i, video)| {
      let is_selected = Some(i) == app.list_state.selected();
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let level = video.level.map_or_else(|| "?".to_string(), |l| l.to_string());
      let badge = format!("{:<3}", level);

      // Right side: channel and first two topics
      let mut meta: Vec<&str> = video.topics.iter().take(2).map(String::as_str).collect();
      if let Some(channel) = video.channel_name.as_deref() {
        meta.insert(0, channel);
      }
      let right = meta.join(" · ");
      let right_w = right.chars().count();
      let title_max = inner_w.saturating_sub(badge.len() + right_w + 3);
      let title = truncate_str(&video.title, title_max);
      let gap = inner_w.saturating_sub(badge.len() + 1 + title.chars().count() + right_w);

      let line = Line::from(vec![
        Span::styled(badge, Style::default().fg(theme.level_color(video.level)).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(title, Style::default().fg(fg)),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme.muted)),
      ]);
      ListItem::new(line).bg(bg)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_filters(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Filters;
  let state = app.catalog.state();
  let options = app.catalog.options();

  let mut lines: Vec<Line> = FilterKey::ALL
    .iter()
    .enumerate()
    .map(|(i, key)| {
      let selected = focused && i == app.filter_row;
      let raw = state.get(*key);
      let value = match key {
        FilterKey::Accent if state.language.is_empty() => "(pick a language)".to_string(),
        FilterKey::Language if !raw.is_empty() => options.language_label(raw).to_string(),
        _ if raw.is_empty() => "any".to_string(),
        _ => raw.to_string(),
      };
      let arrows = if selected && app.facet_choices(*key).is_some() { " ◂▸" } else { "" };
      let label_style = if selected {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.muted)
      };
      let value_style = if raw.is_empty() { Style::default().fg(theme.muted) } else { Style::default().fg(theme.fg) };
      Line::from(vec![
        Span::styled(format!("{:<9}", key.label()), label_style),
        Span::raw(" "),
        Span::styled(value, value_style),
        Span::styled(arrows, Style::default().fg(theme.accent)),
      ])
    })
    .collect();

  if let Some(query) = app.catalog.last_query() {
    let text = if query.is_empty() {
      "all videos".to_string()
    } else {
      query.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(" ")
    };
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(format!("query: {}", text), Style::default().fg(theme.muted))));
  }

  let paragraph = Paragraph::new(lines)
    .wrap(Wrap { trim: true })
    .block(panel(theme, " Filters ", focused).padding(Padding::horizontal(1)));
  frame.render_widget(paragraph, area);
}

fn render_detail(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let Some(video) = app.detail.video.as_ref() else {
    let msg = match &app.detail.loading {
      Some(id) => format!("Loading {}…", id),
      None => "Nothing selected.".to_string(),
    };
    let paragraph = Paragraph::new(msg).alignment(Alignment::Center).block(panel(theme, " Video ", true));
    frame.render_widget(paragraph, area);
    return;
  };

  let [left, right] = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area);
  let [info_area, transcript_area] = Layout::vertical([Constraint::Length(9), Constraint::Min(3)]).areas(left);
  let [vocab_area, grammar_area] =
    Layout::vertical([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(right);

  frame.render_widget(info_paragraph(theme, video, app.catalog.options(), info_area.width), info_area);

  let inner_w = transcript_area.width.saturating_sub(10) as usize;
  let items: Vec<ListItem> = video
    .transcript_json
    .iter()
    .map(|line| {
      ListItem::new(Line::from(vec![
        Span::styled(format!("{} ", format_timestamp(line.start)), Style::default().fg(theme.muted)),
        Span::styled(truncate_str(&line.text, inner_w), Style::default().fg(theme.fg)),
      ]))
    })
    .collect();
  let transcript_block = panel(theme, " Transcript ", true);
  if items.is_empty() {
    let paragraph = Paragraph::new(Span::styled("Transcript not available.", Style::default().fg(theme.muted)))
      .alignment(Alignment::Center)
      .block(transcript_block);
    frame.render_widget(paragraph, transcript_area);
  } else {
    let list = List::new(items)
      .block(transcript_block)
      .highlight_symbol("▶ ")
      .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg));
    frame.render_stateful_widget(list, transcript_area, &mut app.detail.transcript_state);
  }

  let analysis = &video.ai_analysis;
  let mut vocab: Vec<Line> = Vec::new();
  if let Some(summary) = &analysis.transcript_summary {
    vocab.push(Line::from(Span::styled(summary.clone(), Style::default().fg(theme.fg).italic())));
    vocab.push(Line::from(""));
  }
  for item in &analysis.vocabulary {
    vocab.push(Line::from(Span::styled(item.term.clone(), Style::default().fg(theme.accent).bold())));
    vocab.push(Line::from(Span::styled(format!("  {}", item.definition), Style::default().fg(theme.muted))));
  }
  if vocab.is_empty() {
    vocab.push(Line::from(Span::styled("No analysis yet.", Style::default().fg(theme.muted))));
  }
  let paragraph = Paragraph::new(vocab)
    .wrap(Wrap { trim: false })
    .block(panel(theme, " Vocabulary ", false).padding(Padding::horizontal(1)));
  frame.render_widget(paragraph, vocab_area);

  let grammar: Vec<Line> = analysis
    .grammar_stats
    .iter()
    .map(|(k, v)| {
      Line::from(vec![
        Span::styled(format!("{:<22}", grammar_label(k)), Style::default().fg(theme.fg)),
        Span::styled(grammar_value(v), Style::default().fg(theme.accent).bold()),
      ])
    })
    .collect();
  let paragraph = Paragraph::new(grammar).block(panel(theme, " Grammar ", false).padding(Padding::horizontal(1)));
  frame.render_widget(paragraph, grammar_area);
}

fn info_paragraph<'a>(
  theme: &Theme,
  video: &'a VideoDetail,
  options: &'a crate::models::FilterOptions,
  width: u16,
) -> Paragraph<'a> {
  let v = &video.summary;
  let inner_w = width.saturating_sub(4) as usize;
  let field = |label: &'static str, value: String| {
    Line::from(vec![
      Span::styled(format!("{:<10}", label), Style::default().fg(theme.muted)),
      Span::styled(value, Style::default().fg(theme.fg)),
    ])
  };
  let accents = if v.accents.is_empty() { "Neutral".to_string() } else { v.accents.join(", ") };
  let language = v.language.as_deref().map(|code| options.language_label(code).to_string()).unwrap_or_default();
  let lines = vec![
    Line::from(Span::styled(
      truncate_str(&v.title, inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    field("Channel", v.channel_name.clone().unwrap_or_default()),
    Line::from(vec![
      Span::styled(format!("{:<10}", "Level"), Style::default().fg(theme.muted)),
      Span::styled(
        v.level.map_or_else(|| "N/A".to_string(), |l| l.to_string()),
        Style::default().fg(theme.level_color(v.level)).bold(),
      ),
      Span::styled(format!("   {}", language), Style::default().fg(theme.fg)),
    ]),
    field("Speed", format!("{} WPM", v.wpm)),
    field("Duration", format_duration(video.duration_seconds)),
    field("Accents", accents),
    field("Tags", v.topics.iter().take(8).cloned().collect::<Vec<_>>().join(", ")),
  ];
  Paragraph::new(lines).block(panel(theme, " Video ", false).padding(Padding::horizontal(1)))
}

fn render_admin(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let current = app.admin.current_field();
  let mut lines: Vec<Line> = vec![Line::from("")];
  for field in AdminField::ALL {
    if field == AdminField::BatchFile {
      lines.push(Line::from(""));
      lines.push(Line::from(Span::styled(
        "Or upload a JSON list of videos (Enter on this field):",
        Style::default().fg(theme.muted),
      )));
    }
    let selected = field == current;
    let label_style = if selected {
      Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.muted)
    };
    let mut value = app.admin.value(field);
    if selected && field != AdminField::Level {
      value.push('▏');
    }
    let value = if selected && field == AdminField::Level { format!("◂ {} ▸", value) } else { value };
    lines.push(Line::from(vec![
      Span::styled(format!("{:<32}", field.label()), label_style),
      Span::raw(" "),
      Span::styled(value, Style::default().fg(theme.fg)),
    ]));
  }
  lines.push(Line::from(""));
  let key_line = if app.has_admin_key {
    Span::styled("Admin key: set", Style::default().fg(theme.muted))
  } else {
    Span::styled("Admin key: not set (lingoreel set-key <key>)", Style::default().fg(theme.error))
  };
  lines.push(Line::from(key_line));

  let paragraph =
    Paragraph::new(lines).block(panel(theme, " Add video ", true).padding(Padding::horizontal(1)));
  frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(msg) = app.catalog_status() {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.fg))
  } else if app.catalog.phase() == FetchPhase::Error {
    (" ⚠  Showing last loaded results (^r to retry)".to_string(), Style::default().fg(theme.error))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Search;
  let border_color = if focused { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search by title ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let field = &mut app.search;
  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&field.value, field.cursor);
  field.scroll = scroll_to_cursor(field.scroll, cursor_col, inner_w);

  let scroll = field.scroll;
  let visible: String = field
    .value
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused && inner_w > 0 {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

/// Horizontal scroll that keeps the cursor column inside a box `width` wide.
fn scroll_to_cursor(scroll: usize, cursor_col: usize, width: usize) -> usize {
  if width == 0 || cursor_col < scroll {
    cursor_col
  } else if cursor_col >= scroll + width {
    cursor_col + 1 - width
  } else {
    scroll
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Browse => {
      let mut k = vec![("Enter", "Open"), ("j/k", "Navigate"), ("/", "Search"), ("f", "Filters")];
      if app.catalog.has_active_filters() {
        k.push(("x", "Clear"));
      }
      k.push(("a", "Admin"));
      k.push(("^r", "Reload"));
      k.push(("q", "Quit"));
      k
    }
    AppMode::Search => vec![("Enter", "Done"), ("Esc", "Clear")],
    AppMode::Filters => vec![("↑↓", "Facet"), ("←→", "Value"), ("Del", "Unset"), ("Esc", "Back")],
    AppMode::Detail => vec![("j/k", "Transcript"), ("Enter", "Watch from line"), ("Esc", "Back")],
    AppMode::Admin => vec![("Tab", "Next field"), ("Enter", "Submit"), ("Esc", "Back")],
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
        s.push(Span::raw("  "));
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

  #[test]
  fn truncate_keeps_short_strings() {
    assert_eq!(truncate_str("short", 10), "short");
    assert_eq!(truncate_str("exactly10!", 10), "exactly10!");
  }

  #[test]
  fn truncate_adds_ellipsis() {
    assert_eq!(truncate_str("a longer title", 6), "a lon…");
    assert_eq!(truncate_str("日本語のタイトル", 4), "日本語…");
  }

  #[test]
  fn scroll_follows_cursor() {
    assert_eq!(scroll_to_cursor(0, 3, 10), 0);
    assert_eq!(scroll_to_cursor(0, 12, 10), 3);
    assert_eq!(scroll_to_cursor(5, 2, 10), 2);
    assert_eq!(scroll_to_cursor(4, 8, 10), 4);
  }

  #[test]
  fn scroll_never_passes_cursor_in_a_zero_width_box() {
    for cursor in 0..5 {
      let scroll = scroll_to_cursor(0, cursor, 0);
      assert!(scroll <= cursor);
    }
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("abc", 2), 2);
    assert_eq!(display_width("日本", 2), 4);
    assert_eq!(display_width("日本", 1), 2);
  }
}
