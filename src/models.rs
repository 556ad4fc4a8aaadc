//! Wire types for the catalog API.
//!
//! Every optional field tolerates absence or `null`, since the listing
//! endpoint returns partially-analysed records for freshly imported videos.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The six-point CEFR proficiency scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
  A1,
  A2,
  B1,
  B2,
  C1,
  C2,
}

impl CefrLevel {
  pub const ALL: [CefrLevel; 6] =
    [CefrLevel::A1, CefrLevel::A2, CefrLevel::B1, CefrLevel::B2, CefrLevel::C1, CefrLevel::C2];

  pub fn label(self) -> &'static str {
    match self {
      CefrLevel::A1 => "A1",
      CefrLevel::A2 => "A2",
      CefrLevel::B1 => "B1",
      CefrLevel::B2 => "B2",
      CefrLevel::C1 => "C1",
      CefrLevel::C2 => "C2",
    }
  }

  /// Broad band: 'A' beginner, 'B' intermediate, 'C' advanced.
  pub fn band(self) -> char {
    self.label().chars().next().unwrap_or('A')
  }
}

impl fmt::Display for CefrLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for CefrLevel {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let upper = s.trim().to_uppercase();
    CefrLevel::ALL
      .into_iter()
      .find(|l| l.label() == upper)
      .ok_or_else(|| anyhow::anyhow!("unknown CEFR level '{}' (expected A1..C2)", s.trim()))
  }
}

/// Where a video's subtitles came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleSource {
  Manual,
  Generated,
  #[default]
  None,
}

/// One row of the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
  pub video_id: String,
  pub title: String,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub channel_name: Option<String>,
  #[serde(default)]
  pub level: Option<CefrLevel>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub wpm: u32,
  #[serde(default, deserialize_with = "null_as_default")]
  pub topics: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub accents: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub content_types: Vec<String>,
  #[serde(default)]
  pub language: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub subtitle_source: SubtitleSource,
  #[serde(default, deserialize_with = "lenient_timestamp")]
  pub created_at: Option<DateTime<Utc>>,
}

/// One timed transcript line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
  /// Offset from the start of the video, in seconds.
  #[serde(default)]
  pub start: f64,
  #[serde(default)]
  pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
  pub term: String,
  #[serde(default)]
  pub definition: String,
}

/// AI-generated study material attached to a video.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiAnalysis {
  #[serde(default, deserialize_with = "null_as_default")]
  pub vocabulary: Vec<VocabularyItem>,
  /// Grammar feature name to an arbitrary scalar (count, ratio, label).
  #[serde(default, deserialize_with = "null_as_default")]
  pub grammar_stats: BTreeMap<String, serde_json::Value>,
  #[serde(default)]
  pub transcript_summary: Option<String>,
}

impl AiAnalysis {
  pub fn is_empty(&self) -> bool {
    self.vocabulary.is_empty() && self.grammar_stats.is_empty() && self.transcript_summary.is_none()
  }
}

/// Full record returned by `GET /videos/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetail {
  #[serde(flatten)]
  pub summary: VideoSummary,
  #[serde(default, deserialize_with = "null_as_default")]
  pub transcript_json: Vec<TranscriptLine>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub ai_analysis: AiAnalysis,
  #[serde(default)]
  pub duration_seconds: Option<f64>,
}

/// Label and accents offered for one language.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LanguageAccents {
  #[serde(default)]
  pub label: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub accents: Vec<String>,
}

/// Legal values for each facet, as served by `GET /videos/filters`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterOptions {
  #[serde(default, deserialize_with = "null_as_default")]
  pub levels: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub topics: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub content_types: Vec<String>,
  /// Language code to its label and accent list, ordered by code.
  #[serde(default, deserialize_with = "null_as_default")]
  pub accents_data: BTreeMap<String, LanguageAccents>,
}

impl FilterOptions {
  /// Accents selectable under `language`. Empty when no language is chosen
  /// or the language is unknown.
  pub fn accents_for(&self, language: &str) -> &[String] {
    if language.is_empty() {
      return &[];
    }
    self.accents_data.get(language).map(|l| l.accents.as_slice()).unwrap_or(&[])
  }

  /// Display label for a language code, falling back to the code itself.
  pub fn language_label<'a>(&'a self, code: &'a str) -> &'a str {
    self.accents_data.get(code).map(|l| l.label.as_str()).filter(|l| !l.is_empty()).unwrap_or(code)
  }
}

/// Payload for `POST /videos/` and each element of a batch upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVideo {
  pub video_id: String,
  pub title: String,
  pub url: String,
  #[serde(default)]
  pub channel_name: Option<String>,
  #[serde(default)]
  pub level: Option<CefrLevel>,
  #[serde(default)]
  pub language: Option<String>,
  #[serde(default)]
  pub topics: Vec<String>,
  #[serde(default)]
  pub accents: Vec<String>,
  #[serde(default)]
  pub content_types: Vec<String>,
  #[serde(default)]
  pub wpm: u32,
  #[serde(default)]
  pub subtitle_source: SubtitleSource,
  #[serde(default)]
  pub transcript_json: Vec<TranscriptLine>,
  #[serde(default)]
  pub ai_analysis: AiAnalysis,
}

/// Counts reported by the batch endpoint. How duplicates are detected is up
/// to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub created: u32,
  #[serde(default, alias = "ignored_duplicates")]
  pub ignored: u32,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 timestamps and offset-less ISO timestamps (read as UTC).
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  let Some(raw) = Option::<String>::deserialize(deserializer)? else { return Ok(None) };
  if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
    return Ok(Some(dt.with_timezone(&Utc)));
  }
  match NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f") {
    Ok(naive) => Ok(Some(naive.and_utc())),
    Err(_) => Ok(None),
  }
}
