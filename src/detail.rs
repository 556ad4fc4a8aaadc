use crate::models::TranscriptLine;

/// Length of a YouTube video id.
const VIDEO_ID_LEN: usize = 11;

/// Format a duration in seconds as `m:ss`. Missing or non-positive durations
/// render as `00:00`.
pub fn format_duration(seconds: Option<f64>) -> String {
  match seconds {
    Some(s) if s.is_finite() && s > 0.0 => {
      let total = s.floor() as u64;
      format!("{}:{:02}", total / 60, total % 60)
    }
    _ => "00:00".to_string(),
  }
}

/// Format a transcript offset as zero-padded `mm:ss` (hours wrap, as the
/// timestamps are only ever shown next to lines of one video).
pub fn format_timestamp(seconds: f64) -> String {
  if !seconds.is_finite() || seconds < 0.0 {
    return "00:00".to_string();
  }
  let total = seconds.floor() as u64;
  format!("{:02}:{:02}", (total / 60) % 60, total % 60)
}

/// Pull the 11-character id out of any common YouTube URL shape. Input that
/// doesn't look like a URL with an id is returned unchanged, since stored
/// records usually hold the bare id already.
pub fn extract_video_id(input: &str) -> &str {
  let trimmed = input.trim();
  for marker in ["youtu.be/", "v/", "embed/", "watch?v=", "&v="] {
    if let Some(pos) = trimmed.find(marker) {
      let rest = &trimmed[pos + marker.len()..];
      let end = rest.find(['#', '&', '?']).unwrap_or(rest.len());
      let candidate = &rest[..end];
      if candidate.len() == VIDEO_ID_LEN {
        return candidate;
      }
    }
  }
  trimmed
}

/// Browser URL that starts playback at `start` seconds.
pub fn watch_url(video_id: &str, start: Option<f64>) -> String {
  let id = extract_video_id(video_id);
  match start {
    Some(s) if s.is_finite() && s >= 1.0 => format!("https://www.youtube.com/watch?v={}&t={}s", id, s.floor() as u64),
    _ => format!("https://www.youtube.com/watch?v={}", id),
  }
}

/// Index of the transcript line being spoken at `position` seconds.
pub fn line_at(lines: &[TranscriptLine], position: f64) -> Option<usize> {
  if lines.is_empty() || position < lines[0].start {
    return None;
  }
  Some(lines.partition_point(|l| l.start <= position).saturating_sub(1))
}

/// `past_simple` → `Past simple`.
pub fn grammar_label(key: &str) -> String {
  let spaced = key.replace('_', " ");
  let mut chars = spaced.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Render a grammar stat value without JSON quoting.
pub fn grammar_value(value: &serde_json::Value) -> String {
  match value {
    serde_json::Value::String(s) => s.clone(),
    serde_json::Value::Null => "-".to_string(),
    other => other.to_string(),
  }
}
