use anyhow::Result;
use ratatui::widgets::ListState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::admin::{self, VideoForm};
use crate::api::ApiClient;
use crate::config::Config;
use crate::constants::constants;
use crate::controller::{FetchPhase, FilterQueryController, TracingDiagnostics, Update};
use crate::filters::FilterKey;
use crate::input::TextField;
use crate::models::{CefrLevel, VideoDetail, VideoSummary};
use crate::theme::THEMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  /// Navigating the video list.
  Browse,
  /// Typing into the title search box.
  Search,
  /// Editing the facet panel.
  Filters,
  /// Looking at one video.
  Detail,
  /// Admin form and batch upload.
  Admin,
}

/// Fields of the admin panel, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminField {
  VideoId,
  Title,
  Url,
  Channel,
  Level,
  Language,
  Topics,
  Accents,
  ContentTypes,
  BatchFile,
}

impl AdminField {
  pub const ALL: [AdminField; 10] = [
    AdminField::VideoId,
    AdminField::Title,
    AdminField::Url,
    AdminField::Channel,
    AdminField::Level,
    AdminField::Language,
    AdminField::Topics,
    AdminField::Accents,
    AdminField::ContentTypes,
    AdminField::BatchFile,
  ];

  pub fn label(self) -> &'static str {
    match self {
      AdminField::VideoId => "Video ID",
      AdminField::Title => "Title",
      AdminField::Url => "URL",
      AdminField::Channel => "Channel",
      AdminField::Level => "Level",
      AdminField::Language => "Language",
      AdminField::Topics => "Topics (comma separated)",
      AdminField::Accents => "Accents (comma separated)",
      AdminField::ContentTypes => "Content types (comma separated)",
      AdminField::BatchFile => "Batch JSON file",
    }
  }
}

/// Admin panel state.
#[derive(Default)]
pub struct AdminState {
  pub form: VideoForm,
  pub batch_path: String,
  pub field: usize,
}

impl AdminState {
  pub fn current_field(&self) -> AdminField {
    AdminField::ALL[self.field % AdminField::ALL.len()]
  }

  /// Text behind a field. `None` for fields that aren't free text.
  pub fn text_mut(&mut self, field: AdminField) -> Option<&mut String> {
    match field {
      AdminField::VideoId => Some(&mut self.form.video_id),
      AdminField::Title => Some(&mut self.form.title),
      AdminField::Url => Some(&mut self.form.url),
      AdminField::Channel => Some(&mut self.form.channel_name),
      AdminField::Language => Some(&mut self.form.language),
      AdminField::Topics => Some(&mut self.form.topics),
      AdminField::Accents => Some(&mut self.form.accents),
      AdminField::ContentTypes => Some(&mut self.form.content_types),
      AdminField::BatchFile => Some(&mut self.batch_path),
      AdminField::Level => None,
    }
  }

  pub fn value(&self, field: AdminField) -> String {
    match field {
      AdminField::VideoId => self.form.video_id.clone(),
      AdminField::Title => self.form.title.clone(),
      AdminField::Url => self.form.url.clone(),
      AdminField::Channel => self.form.channel_name.clone(),
      AdminField::Level => self.form.level.to_string(),
      AdminField::Language => self.form.language.clone(),
      AdminField::Topics => self.form.topics.clone(),
      AdminField::Accents => self.form.accents.clone(),
      AdminField::ContentTypes => self.form.content_types.clone(),
      AdminField::BatchFile => self.batch_path.clone(),
    }
  }

  pub fn cycle_level(&mut self, forward: bool) {
    let idx = CefrLevel::ALL.iter().position(|l| *l == self.form.level).unwrap_or(0);
    let len = CefrLevel::ALL.len();
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    self.form.level = CefrLevel::ALL[next];
  }
}

/// The video shown in [`AppMode::Detail`].
#[derive(Default)]
pub struct DetailView {
  pub video: Option<VideoDetail>,
  /// Id being fetched, for the status line.
  pub loading: Option<String>,
  pub transcript_state: ListState,
}

/// Outcome message of a finished admin request.
type AdminResult = Result<String>;

/// Which admin request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdminRequest {
  Form,
  Batch,
}

/// In-flight async task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) detail_rx: Option<oneshot::Receiver<Result<VideoDetail>>>,
  pub(crate) admin_rx: Option<(AdminRequest, oneshot::Receiver<AdminResult>)>,
}

pub struct App {
  pub mode: AppMode,
  pub theme_index: usize,
  pub catalog: FilterQueryController,
  pub api: ApiClient,
  pub has_admin_key: bool,
  pub list_state: ListState,
  pub search: TextField,
  /// Selected row in the facet panel (index into `FilterKey::ALL`).
  pub filter_row: usize,
  pub detail: DetailView,
  pub admin: AdminState,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, shown with lower priority than status/error.
  pub info_message: Option<String>,
  pub should_quit: bool,
  pub(crate) tasks: AsyncTasks,
  config: Config,
  /// When the last error was set, for auto-dismiss.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(config: Config, api: ApiClient, initial_filters: Vec<(FilterKey, String)>) -> Self {
    let theme_index =
      if let Some(ref name) = config.theme_name { THEMES.iter().position(|t| t.name == name).unwrap_or(0) } else { 0 };
    let has_admin_key = config.admin_key().is_some();

    let catalog =
      FilterQueryController::new(Arc::new(api.clone()), Arc::new(TracingDiagnostics), constants().debounce())
        .with_filters(initial_filters);
    let search = TextField::with_value(&catalog.state().search);

    Self {
      mode: AppMode::Browse,
      theme_index,
      catalog,
      api,
      has_admin_key,
      list_state: ListState::default(),
      search,
      filter_row: 0,
      detail: DetailView::default(),
      admin: AdminState::default(),
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      tasks: AsyncTasks::default(),
      config,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    // Safety: theme_index is always bounded by modular arithmetic in next_theme()
    // and clamped to THEMES.len() - 1 on initialization.
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    if let Err(e) = self.config.save() {
      warn!(err = %format!("{:#}", e), "app: could not save theme");
    }
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after the configured delay.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  pub fn selected_video(&self) -> Option<&VideoSummary> {
    self.list_state.selected().and_then(|i| self.catalog.videos().get(i))
  }

  /// Keep the list selection inside the current result set.
  fn clamp_selection(&mut self) {
    let len = self.catalog.videos().len();
    if len == 0 {
      self.list_state.select(None);
    } else {
      let sel = self.list_state.selected().unwrap_or(0);
      self.list_state.select(Some(sel.min(len - 1)));
    }
  }

  // --- Filters ---

  /// Mirror the search box into the title filter.
  pub fn search_changed(&mut self) {
    self.catalog.set_filter(FilterKey::Search, self.search.value.clone());
  }

  pub fn clear_filters(&mut self) {
    self.catalog.clear_all();
    self.search = TextField::default();
    self.list_state.select(Some(0));
  }

  pub fn selected_filter(&self) -> FilterKey {
    FilterKey::ALL[self.filter_row % FilterKey::ALL.len()]
  }

  /// Values a facet can take, or `None` for free-text facets.
  pub fn facet_choices(&self, key: FilterKey) -> Option<Vec<String>> {
    let options = self.catalog.options();
    match key {
      FilterKey::Level if options.levels.is_empty() => Some(constants().cefr_levels.clone()),
      FilterKey::Level => Some(options.levels.clone()),
      FilterKey::Topic => Some(options.topics.clone()),
      FilterKey::Type => Some(options.content_types.clone()),
      FilterKey::Language => Some(options.accents_data.keys().cloned().collect()),
      FilterKey::Accent => Some(self.catalog.available_accents().to_vec()),
      FilterKey::Search | FilterKey::Source | FilterKey::Speed | FilterKey::Channel => None,
    }
  }

  /// Step the selected facet through its choices.
  pub fn cycle_selected_filter(&mut self, forward: bool) {
    let key = self.selected_filter();
    let Some(choices) = self.facet_choices(key) else { return };
    if key == FilterKey::Accent && self.catalog.state().language.is_empty() {
      self.info_message = Some("Pick a language first.".to_string());
      return;
    }
    let next = cycle_choice(&choices, self.catalog.state().get(key), forward);
    self.catalog.set_filter(key, next);
    if key == FilterKey::Search {
      self.search = TextField::with_value(&self.catalog.state().search);
    }
  }

  /// Apply a free-text edit to the selected facet.
  pub fn edit_selected_filter(&mut self, edit: impl FnOnce(&mut String)) {
    let key = self.selected_filter();
    if self.facet_choices(key).is_some() {
      return;
    }
    let mut value = self.catalog.state().get(key).to_string();
    edit(&mut value);
    self.catalog.set_filter(key, value);
    if key == FilterKey::Search {
      self.search = TextField::with_value(&self.catalog.state().search);
    }
  }

  // --- Background work ---

  pub fn check_pending(&mut self) {
    for update in self.catalog.poll() {
      match update {
        Update::VideosReplaced(count) => {
          debug!(count, "app: list replaced");
          self.clamp_selection();
          if self.list_state.selected().is_none() && count > 0 {
            self.list_state.select(Some(0));
          }
        }
        Update::FetchFailed => {
          let msg = self.catalog.last_error().unwrap_or("unknown error").to_string();
          self.set_error(format!("Could not load videos: {}", msg));
        }
        Update::OptionsFailed => {
          let msg = self.catalog.options_error().unwrap_or("unknown error").to_string();
          self.set_error(format!("Could not load filter options: {}", msg));
        }
        Update::FetchIssued | Update::OptionsLoaded | Update::Discarded => {}
      }
    }

    if let Some(mut rx) = self.tasks.detail_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.detail.loading = None;
          match result {
            Ok(video) => {
              self.detail.transcript_state = ListState::default();
              if !video.transcript_json.is_empty() {
                self.detail.transcript_state.select(Some(0));
              }
              self.detail.video = Some(video);
            }
            Err(e) => {
              self.set_error(format!("Failed to load video: {:#}", e));
              self.mode = AppMode::Browse;
            }
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.detail_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.detail.loading = None;
          self.set_error("Detail task failed.".to_string());
        }
      }
    }

    if let Some((request, mut rx)) = self.tasks.admin_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.status_message = None;
          match result {
            Ok(msg) => {
              self.info_message = Some(msg);
              if request == AdminRequest::Form {
                self.admin.form.reset_for_next();
                self.admin.field = 0;
              }
              self.catalog.refresh();
            }
            Err(e) => self.set_error(format!("{:#}", e)),
          }
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.admin_rx = Some((request, rx));
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Admin task failed.".to_string());
        }
      }
    }
  }

  /// Status line text for the catalog's current phase, if it has one.
  pub fn catalog_status(&self) -> Option<&'static str> {
    match self.catalog.phase() {
      FetchPhase::Loading => Some("Loading videos…"),
      FetchPhase::Debouncing => Some("Updating…"),
      FetchPhase::Idle | FetchPhase::Error => None,
    }
  }

  pub fn trigger_detail(&mut self) {
    let Some(video) = self.selected_video() else { return };
    let video_id = video.video_id.clone();
    self.clear_error();
    self.detail.video = None;
    self.detail.loading = Some(video_id.clone());
    self.mode = AppMode::Detail;
    info!(video_id = %video_id, "app: opening detail");

    let api = self.api.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(api.video(&video_id).await);
    });
    self.tasks.detail_rx = Some(rx);
  }

  /// Submit the form, or upload the batch file when that field is focused.
  pub fn trigger_admin_submit(&mut self) {
    if self.tasks.admin_rx.is_some() {
      return;
    }
    if !self.has_admin_key {
      self.set_error("No admin key set. Run `lingoreel set-key <key>` first.".to_string());
      return;
    }
    self.clear_error();
    let api = self.api.clone();
    let (tx, rx) = oneshot::channel();

    let request = if self.admin.current_field() == AdminField::BatchFile { AdminRequest::Batch } else { AdminRequest::Form };
    if request == AdminRequest::Batch {
      let path = PathBuf::from(self.admin.batch_path.trim());
      let videos = match admin::load_batch(&path) {
        Ok(v) => v,
        Err(e) => {
          self.set_error(format!("Batch rejected: {}", e));
          return;
        }
      };
      self.status_message = Some(format!("Uploading {} videos…", videos.len()));
      tokio::spawn(async move {
        let result = admin::upload_batch(&api, &videos)
          .await
          .map(|o| format!("Batch uploaded: {} created, {} ignored.", o.created, o.ignored));
        let _ = tx.send(result);
      });
    } else {
      if let Err(e) = self.admin.form.to_payload() {
        self.set_error(format!("{}", e));
        return;
      }
      let form = self.admin.form.clone();
      self.status_message = Some("Saving video…".to_string());
      tokio::spawn(async move {
        let result = admin::submit_video(&api, &form).await.map(|v| format!("Video '{}' created.", v.title));
        let _ = tx.send(result);
      });
    }
    self.tasks.admin_rx = Some((request, rx));
  }

  /// Open the detail video in the browser, at the selected transcript line.
  pub fn open_in_browser(&mut self) {
    let Some(ref video) = self.detail.video else { return };
    let start =
      self.detail.transcript_state.selected().and_then(|i| video.transcript_json.get(i)).map(|l| l.start);
    let url = crate::detail::watch_url(&video.summary.video_id, start);

    #[cfg(target_os = "macos")]
    let cmd = "open";
    #[cfg(not(target_os = "macos"))]
    let cmd = "xdg-open";
    match std::process::Command::new(cmd)
      .arg(&url)
      .stdin(std::process::Stdio::null())
      .stdout(std::process::Stdio::null())
      .stderr(std::process::Stdio::null())
      .spawn()
    {
      Ok(mut child) => {
        // Reap the child in a background thread to avoid zombie processes.
        std::thread::spawn(move || {
          let _ = child.wait();
        });
      }
      Err(e) => {
        self.set_error(format!("Failed to open browser: {}", e));
      }
    }
  }
}

/// Next value after `current` in `["", choices...]`, wrapping. Unknown
/// current values restart from the first choice.
pub fn cycle_choice(choices: &[String], current: &str, forward: bool) -> String {
  let len = choices.len() + 1;
  let idx = if current.is_empty() { 0 } else { choices.iter().position(|c| c == current).map_or(0, |i| i + 1) };
  let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
  if next == 0 { String::new() } else { choices[next - 1].clone() }
}
