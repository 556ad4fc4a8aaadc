use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{AdminField, App, AppMode};
use crate::filters::FilterKey;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Single-line text input with a char-indexed cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
  pub value: String,
  pub cursor: usize,
  /// Horizontal scroll offset in display columns.
  pub scroll: usize,
}

impl TextField {
  pub fn with_value(value: &str) -> Self {
    Self { value: value.to_string(), cursor: value.chars().count(), scroll: 0 }
  }

  /// Apply an editing key. Returns true when the text changed.
  pub fn handle_key(&mut self, code: KeyCode) -> bool {
    match code {
      KeyCode::Char(c) => {
        let byte_idx = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_idx, c);
        self.cursor += 1;
        true
      }
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          let byte_idx = char_to_byte_index(&self.value, self.cursor);
          self.value.remove(byte_idx);
          true
        } else {
          false
        }
      }
      KeyCode::Delete => {
        if self.cursor < self.value.chars().count() {
          let byte_idx = char_to_byte_index(&self.value, self.cursor);
          self.value.remove(byte_idx);
          true
        } else {
          false
        }
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        false
      }
      KeyCode::Right => {
        if self.cursor < self.value.chars().count() {
          self.cursor += 1;
        }
        false
      }
      KeyCode::Home => {
        self.cursor = 0;
        false
      }
      KeyCode::End => {
        self.cursor = self.value.chars().count();
        false
      }
      _ => false,
    }
  }
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  // Ctrl+R: refetch now (manual retry after a failure)
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('r') {
    app.clear_error();
    app.catalog.refresh();
    return;
  }

  // Ctrl+L: empty the list, then reload it
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('l') {
    app.catalog.reset_videos();
    app.list_state.select(None);
    app.catalog.refresh();
    return;
  }

  match app.mode {
    AppMode::Browse => handle_browse_key(app, key),
    AppMode::Search => handle_search_key(app, key),
    AppMode::Filters => handle_filters_key(app, key),
    AppMode::Detail => handle_detail_key(app, key),
    AppMode::Admin => handle_admin_key(app, key),
  }
}

fn handle_browse_key(app: &mut App, key: event::KeyEvent) {
  app.info_message = None;
  match key.code {
    KeyCode::Enter => app.trigger_detail(),
    KeyCode::Char('/') => app.mode = AppMode::Search,
    KeyCode::Char('f') => app.mode = AppMode::Filters,
    KeyCode::Char('a') => app.mode = AppMode::Admin,
    KeyCode::Char('x') => app.clear_filters(),
    KeyCode::Down | KeyCode::Char('j') => {
      let count = app.catalog.videos().len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| (i + 1) % count);
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      let count = app.catalog.videos().len();
      if count > 0 {
        let i =
          app.list_state.selected().map_or(0, |i| if i == 0 { count.saturating_sub(1) } else { i.saturating_sub(1) });
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter | KeyCode::Down => app.mode = AppMode::Browse,
    KeyCode::Esc => {
      // Clear the search and go back to the list
      if !app.search.value.is_empty() {
        app.search = Default::default();
        app.search_changed();
      }
      app.mode = AppMode::Browse;
    }
    code => {
      if app.search.handle_key(code) {
        app.search_changed();
      }
    }
  }
}

fn handle_filters_key(app: &mut App, key: event::KeyEvent) {
  app.info_message = None;
  let rows = FilterKey::ALL.len();
  match key.code {
    KeyCode::Down | KeyCode::Tab => app.filter_row = (app.filter_row + 1) % rows,
    KeyCode::Up | KeyCode::BackTab => app.filter_row = (app.filter_row + rows - 1) % rows,
    KeyCode::Right => app.cycle_selected_filter(true),
    KeyCode::Left => app.cycle_selected_filter(false),
    KeyCode::Char(c) => app.edit_selected_filter(|v| v.push(c)),
    KeyCode::Backspace => app.edit_selected_filter(|v| {
      v.pop();
    }),
    KeyCode::Delete => {
      let key = app.selected_filter();
      app.catalog.set_filter(key, "");
      if key == FilterKey::Search {
        app.search = Default::default();
      }
    }
    KeyCode::Enter | KeyCode::Esc => app.mode = AppMode::Browse,
    _ => {}
  }
}

fn handle_detail_key(app: &mut App, key: event::KeyEvent) {
  let lines = app.detail.video.as_ref().map_or(0, |v| v.transcript_json.len());
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => {
      if lines > 0 {
        let i = app.detail.transcript_state.selected().map_or(0, |i| (i + 1).min(lines - 1));
        app.detail.transcript_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if lines > 0 {
        let i = app.detail.transcript_state.selected().map_or(0, |i| i.saturating_sub(1));
        app.detail.transcript_state.select(Some(i));
      }
    }
    KeyCode::Enter | KeyCode::Char('o') => app.open_in_browser(),
    KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => {
      app.tasks.detail_rx = None;
      app.detail.loading = None;
      app.mode = AppMode::Browse;
    }
    _ => {}
  }
}

fn handle_admin_key(app: &mut App, key: event::KeyEvent) {
  let fields = AdminField::ALL.len();
  match key.code {
    KeyCode::Down | KeyCode::Tab => app.admin.field = (app.admin.field + 1) % fields,
    KeyCode::Up | KeyCode::BackTab => app.admin.field = (app.admin.field + fields - 1) % fields,
    KeyCode::Enter => app.trigger_admin_submit(),
    KeyCode::Esc => app.mode = AppMode::Browse,
    KeyCode::Left | KeyCode::Right if app.admin.current_field() == AdminField::Level => {
      app.admin.cycle_level(key.code == KeyCode::Right);
    }
    KeyCode::Char(c) => {
      let field = app.admin.current_field();
      if let Some(text) = app.admin.text_mut(field) {
        text.push(c);
      }
    }
    KeyCode::Backspace => {
      let field = app.admin.current_field();
      if let Some(text) = app.admin.text_mut(field) {
        text.pop();
      }
    }
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

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
    assert_eq!(char_to_byte_index(s, 3), 6); // past end
  }

  // --- TextField ---

  #[test]
  fn text_field_inserts_at_cursor() {
    let mut f = TextField::with_value("caf");
    assert!(f.handle_key(KeyCode::Char('é')));
    assert_eq!(f.value, "café");
    assert!(!f.handle_key(KeyCode::Home));
    assert!(f.handle_key(KeyCode::Char('¡')));
    assert_eq!(f.value, "¡café");
    assert_eq!(f.cursor, 1);
  }

  #[test]
  fn text_field_backspace_and_delete_report_changes() {
    let mut f = TextField::with_value("ab");
    assert!(f.handle_key(KeyCode::Backspace));
    assert_eq!(f.value, "a");
    assert!(!f.handle_key(KeyCode::Delete));
    f.handle_key(KeyCode::Home);
    assert!(!f.handle_key(KeyCode::Backspace));
    assert!(f.handle_key(KeyCode::Delete));
    assert_eq!(f.value, "");
  }

  #[test]
  fn text_field_cursor_stays_in_bounds() {
    let mut f = TextField::with_value("日本");
    f.handle_key(KeyCode::Right);
    assert_eq!(f.cursor, 2);
    f.handle_key(KeyCode::Left);
    f.handle_key(KeyCode::Left);
    f.handle_key(KeyCode::Left);
    assert_eq!(f.cursor, 0);
    f.handle_key(KeyCode::End);
    assert_eq!(f.cursor, 2);
  }
}
