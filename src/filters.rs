//! Filter selection state and the query it derives.

use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Every facet the catalog can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum FilterKey {
  Search,
  Level,
  Topic,
  Type,
  Language,
  Accent,
  Source,
  Speed,
  Channel,
}

impl FilterKey {
  pub const ALL: [FilterKey; 9] = [
    FilterKey::Search,
    FilterKey::Level,
    FilterKey::Topic,
    FilterKey::Type,
    FilterKey::Language,
    FilterKey::Accent,
    FilterKey::Source,
    FilterKey::Speed,
    FilterKey::Channel,
  ];

  /// Name of the field in the UI and on the command line.
  pub fn label(self) -> &'static str {
    match self {
      FilterKey::Search => "search",
      FilterKey::Level => "level",
      FilterKey::Topic => "topic",
      FilterKey::Type => "type",
      FilterKey::Language => "language",
      FilterKey::Accent => "accent",
      FilterKey::Source => "source",
      FilterKey::Speed => "speed",
      FilterKey::Channel => "channel",
    }
  }

  /// Name of the query parameter the listing endpoint expects.
  pub fn api_param(self) -> &'static str {
    match self {
      FilterKey::Search => "title",
      FilterKey::Type => "content_types",
      other => other.label(),
    }
  }
}

impl fmt::Display for FilterKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Current value of every facet. An empty string means "no constraint".
///
/// `accent` is only meaningful under a `language`; [`FilterState::set`] keeps
/// the two consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
  pub search: String,
  pub level: String,
  pub topic: String,
  pub content_type: String,
  pub language: String,
  pub accent: String,
  pub source: String,
  pub speed: String,
  pub channel: String,
}

impl FilterState {
  pub fn get(&self, key: FilterKey) -> &str {
    match key {
      FilterKey::Search => &self.search,
      FilterKey::Level => &self.level,
      FilterKey::Topic => &self.topic,
      FilterKey::Type => &self.content_type,
      FilterKey::Language => &self.language,
      FilterKey::Accent => &self.accent,
      FilterKey::Source => &self.source,
      FilterKey::Speed => &self.speed,
      FilterKey::Channel => &self.channel,
    }
  }

  fn slot(&mut self, key: FilterKey) -> &mut String {
    match key {
      FilterKey::Search => &mut self.search,
      FilterKey::Level => &mut self.level,
      FilterKey::Topic => &mut self.topic,
      FilterKey::Type => &mut self.content_type,
      FilterKey::Language => &mut self.language,
      FilterKey::Accent => &mut self.accent,
      FilterKey::Source => &mut self.source,
      FilterKey::Speed => &mut self.speed,
      FilterKey::Channel => &mut self.channel,
    }
  }

  /// Set one facet. Changing `language` always clears `accent`, even when the
  /// new language is the same as the old one. An accent with no language is
  /// dropped.
  pub fn set(&mut self, key: FilterKey, value: impl Into<String>) {
    let value = value.into();
    if key == FilterKey::Accent && self.language.is_empty() && !value.is_empty() {
      debug!(accent = %value, "filters: accent without a language dropped");
      self.accent.clear();
      return;
    }
    *self.slot(key) = value;
    if key == FilterKey::Language {
      self.accent.clear();
    }
  }

  pub fn clear(&mut self) {
    *self = Self::default();
  }

  pub fn is_empty(&self) -> bool {
    FilterKey::ALL.iter().all(|k| self.get(*k).is_empty())
  }

  /// Facets that currently constrain the listing, in key order.
  pub fn active(&self) -> impl Iterator<Item = (FilterKey, &str)> {
    FilterKey::ALL.into_iter().map(|k| (k, self.get(k))).filter(|(_, v)| !v.is_empty())
  }
}

/// Server-ready listing parameters: only constrained facets, keyed by API
/// parameter name.
pub type QueryParams = BTreeMap<&'static str, String>;

/// Build the listing query for a filter snapshot.
///
/// Unset facets are omitted rather than sent as empty strings; the server
/// treats a missing parameter as "no constraint".
pub fn derive_query(state: &FilterState) -> QueryParams {
  state.active().map(|(key, value)| (key.api_param(), value.to_string())).collect()
}

/// Parse a `key=value` pair as given on the command line.
pub fn parse_assignment(raw: &str) -> anyhow::Result<(FilterKey, String)> {
  let (key, value) =
    raw.split_once('=').ok_or_else(|| anyhow::anyhow!("expected key=value, got '{}'", raw))?;
  let key = FilterKey::from_str(key.trim(), true).map_err(|e| anyhow::anyhow!("unknown filter '{}': {}", key, e))?;
  Ok((key, value.trim().to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn populated() -> FilterState {
    let mut s = FilterState::default();
    s.set(FilterKey::Search, "coffee");
    s.set(FilterKey::Level, "B1");
    s.set(FilterKey::Topic, "Travel");
    s.set(FilterKey::Type, "Interview");
    s.set(FilterKey::Language, "en");
    s.set(FilterKey::Accent, "British");
    s.set(FilterKey::Channel, "EasyEnglish");
    s
  }

  #[test]
  fn language_change_clears_accent() {
    let mut s = FilterState::default();
    s.set(FilterKey::Language, "en");
    s.set(FilterKey::Accent, "British");
    s.set(FilterKey::Language, "fr");
    assert_eq!(s.language, "fr");
    assert_eq!(s.accent, "");
  }

  #[test]
  fn reselecting_same_language_still_clears_accent() {
    let mut s = FilterState::default();
    s.set(FilterKey::Language, "en");
    s.set(FilterKey::Accent, "US");
    s.set(FilterKey::Language, "en");
    assert_eq!(s.accent, "");
  }

  #[test]
  fn clearing_language_clears_accent() {
    let mut s = populated();
    s.set(FilterKey::Language, "");
    assert!(s.language.is_empty() && s.accent.is_empty());
  }

  #[test]
  fn accent_without_language_is_not_stored() {
    let mut s = FilterState::default();
    s.set(FilterKey::Accent, "British");
    assert_eq!(s.accent, "");
    assert!(derive_query(&s).is_empty());

    s.set(FilterKey::Language, "en");
    s.set(FilterKey::Accent, "British");
    assert_eq!(s.accent, "British");
  }

  #[test]
  fn only_language_cascades() {
    let mut s = populated();
    for key in FilterKey::ALL.into_iter().filter(|k| *k != FilterKey::Language) {
      s.set(key, "x");
    }
    assert_eq!(s.language, "en");
    assert_eq!(s.accent, "x");
    assert_eq!(s.level, "x");
  }

  #[test]
  fn derive_query_applies_renames_and_drops_empty() {
    let q = derive_query(&populated());
    assert_eq!(q.get("title").map(String::as_str), Some("coffee"));
    assert_eq!(q.get("content_types").map(String::as_str), Some("Interview"));
    assert!(!q.contains_key("search"));
    assert!(!q.contains_key("type"));
    assert!(!q.contains_key("speed"));
    assert!(!q.contains_key("source"));
    assert!(q.values().all(|v| !v.is_empty()));
    assert_eq!(q.len(), 7);
  }

  #[test]
  fn derive_query_is_pure_and_order_independent() {
    let a = populated();
    let before = a.clone();
    let first = derive_query(&a);
    let second = derive_query(&a);
    assert_eq!(first, second);
    assert_eq!(a, before);

    let mut b = FilterState::default();
    b.set(FilterKey::Channel, "EasyEnglish");
    b.set(FilterKey::Language, "en");
    b.set(FilterKey::Accent, "British");
    b.set(FilterKey::Type, "Interview");
    b.set(FilterKey::Topic, "Travel");
    b.set(FilterKey::Level, "B1");
    b.set(FilterKey::Search, "coffee");
    assert_eq!(derive_query(&b), first);
  }

  #[test]
  fn cleared_state_derives_empty_query() {
    let mut s = populated();
    s.clear();
    assert!(s.is_empty());
    assert!(derive_query(&s).is_empty());
    assert_eq!(derive_query(&s), derive_query(&FilterState::default()));
  }

  #[test]
  fn parse_assignment_accepts_known_keys() {
    assert_eq!(parse_assignment("level=B2").unwrap(), (FilterKey::Level, "B2".to_string()));
    assert_eq!(parse_assignment(" Language = en ").unwrap(), (FilterKey::Language, "en".to_string()));
    assert_eq!(parse_assignment("search=").unwrap(), (FilterKey::Search, String::new()));
  }

  #[test]
  fn parse_assignment_rejects_unknown_key_and_missing_equals() {
    assert!(parse_assignment("colour=red").is_err());
    assert!(parse_assignment("level").is_err());
  }
}
