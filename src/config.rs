use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::constants;

/// User preferences persisted in `prefs.toml`.
///
/// `admin_key` is the client-stored secret sent as the admin header on every
/// request once set.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub api_url: Option<String>,
  pub admin_key: Option<String>,
  pub theme_name: Option<String>,
}

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "lingoreel")
}

/// Directory for rolling log files. `None` when no home directory is known.
pub fn log_dir() -> Option<PathBuf> {
  project_dirs().map(|d| d.data_local_dir().join("logs"))
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = project_dirs() {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(&config_file) {
        match toml::from_str(&content) {
          Ok(config) => return config,
          Err(e) => warn!(path = %config_file.display(), err = %e, "config: ignoring malformed prefs"),
        }
      }
    }
    Self::default()
  }

  pub fn save(&self) -> Result<()> {
    let proj_dirs = project_dirs().context("No home directory to keep prefs in")?;
    self.save_to(&proj_dirs.config_dir().join("prefs.toml"))
  }

  fn save_to(&self, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("Failed to serialize prefs")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write prefs to {}", path.display()))
  }

  /// Base URL of the catalog API, without a trailing slash.
  pub fn api_url(&self) -> String {
    self.api_url.as_deref().unwrap_or(&constants().default_api_url).trim_end_matches('/').to_string()
  }

  /// The admin key, if one is stored and not blank.
  pub fn admin_key(&self) -> Option<&str> {
    self.admin_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
  }
}
