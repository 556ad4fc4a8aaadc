//! Admin console: manual video entry and batch JSON upload.
//!
//! Input is validated locally and rejected as a whole before anything is
//! sent. Whether a record already exists is decided by the server.

use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::constants::constants;
use crate::models::{AiAnalysis, BatchOutcome, CefrLevel, NewVideo, SubtitleSource, VideoSummary};

/// Why a batch file was refused.
#[derive(Debug, Error)]
pub enum BatchError {
  #[error("could not read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("not a JSON list of videos: {0}")]
  Shape(#[from] serde_json::Error),
  #[error("the batch is empty")]
  Empty,
  #[error("entry {index} has an empty video_id")]
  MissingId { index: usize },
  #[error("video_id '{id}' appears more than once")]
  DuplicateId { id: String },
}

/// Parse and validate the contents of a batch upload file.
pub fn parse_batch(text: &str) -> Result<Vec<NewVideo>, BatchError> {
  let videos: Vec<NewVideo> = serde_json::from_str(text)?;
  if videos.is_empty() {
    return Err(BatchError::Empty);
  }
  let mut seen = HashSet::new();
  for (index, video) in videos.iter().enumerate() {
    let id = video.video_id.trim();
    if id.is_empty() {
      return Err(BatchError::MissingId { index });
    }
    if !seen.insert(id) {
      return Err(BatchError::DuplicateId { id: id.to_string() });
    }
  }
  Ok(videos)
}

pub fn load_batch(path: &Path) -> Result<Vec<NewVideo>, BatchError> {
  let text = std::fs::read_to_string(path).map_err(|source| BatchError::Read { path: path.to_path_buf(), source })?;
  parse_batch(&text)
}

/// Upload a validated batch. Files above the server's per-request cap are
/// still sent whole so the server can reject them as a unit.
pub async fn upload_batch(api: &ApiClient, videos: &[NewVideo]) -> Result<BatchOutcome> {
  if videos.len() > constants().batch_soft_limit {
    warn!(count = videos.len(), limit = constants().batch_soft_limit, "admin: batch exceeds server limit");
  }
  let outcome = api.create_batch(videos).await?;
  info!(created = outcome.created, ignored = outcome.ignored, "admin: batch uploaded");
  Ok(outcome)
}

/// Split a comma-separated field into trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
  raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// The single-video form as typed by the user. List fields are
/// comma-separated text.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoForm {
  pub video_id: String,
  pub title: String,
  pub url: String,
  pub channel_name: String,
  pub level: CefrLevel,
  pub language: String,
  pub topics: String,
  pub accents: String,
  pub content_types: String,
}

impl Default for VideoForm {
  fn default() -> Self {
    Self {
      video_id: String::new(),
      title: String::new(),
      url: String::new(),
      channel_name: String::new(),
      level: CefrLevel::B1,
      language: "en".to_string(),
      topics: String::new(),
      accents: String::new(),
      content_types: String::new(),
    }
  }
}

impl VideoForm {
  /// Build the create payload, or say which required field is missing.
  pub fn to_payload(&self) -> Result<NewVideo> {
    let required = [("video id", &self.video_id), ("title", &self.title), ("url", &self.url)];
    if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
      return Err(anyhow!("{} is required", name));
    }
    let optional = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
    Ok(NewVideo {
      video_id: self.video_id.trim().to_string(),
      title: self.title.trim().to_string(),
      url: self.url.trim().to_string(),
      channel_name: optional(&self.channel_name),
      level: Some(self.level),
      language: optional(&self.language),
      topics: split_list(&self.topics),
      accents: split_list(&self.accents),
      content_types: split_list(&self.content_types),
      wpm: constants().default_wpm,
      subtitle_source: SubtitleSource::None,
      transcript_json: Vec::new(),
      ai_analysis: AiAnalysis::default(),
    })
  }

  /// After a successful submit, keep the shared fields (channel, level,
  /// language, lists) for the next entry.
  pub fn reset_for_next(&mut self) {
    self.video_id.clear();
    self.title.clear();
    self.url.clear();
  }
}

pub async fn submit_video(api: &ApiClient, form: &VideoForm) -> Result<VideoSummary> {
  let payload = form.to_payload()?;
  let created = api.create_video(&payload).await?;
  info!(video_id = %created.video_id, "admin: video created");
  Ok(created)
}
