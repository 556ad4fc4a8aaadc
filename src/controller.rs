//! Filter-driven catalog retrieval.
//!
//! [`FilterQueryController`] owns the filter selection, the facet options and
//! the displayed video list. Edits re-arm a trailing-edge debounce timer; when
//! it fires the current filters are turned into a [`QueryParams`] and exactly
//! one listing request is issued.
//!
//! Timers and requests run as spawned tokio tasks that post
//! [`ControllerEvent`]s back over a channel. Nothing outside the owner ever
//! touches controller state: the owner drains events with
//! [`FilterQueryController::poll`] once per UI frame.
//!
//! Responses are applied in request-issue order. Each request carries a
//! sequence number and only the latest one, while still awaited, may replace
//! the list; anything else is dropped on arrival.

use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::filters::{FilterKey, FilterState, QueryParams, derive_query};
use crate::models::{FilterOptions, VideoSummary};

/// Remote catalog the controller reads from.
///
/// Futures are `'static` so they can be moved onto spawned tasks.
pub trait VideoSource: Send + Sync {
  fn list_videos(&self, query: QueryParams) -> BoxFuture<'static, Result<Vec<VideoSummary>>>;
  fn filter_options(&self) -> BoxFuture<'static, Result<FilterOptions>>;
}

/// Fire-and-forget sink for retrieval failures.
pub trait Diagnostics: Send + Sync {
  fn report(&self, context: &str, err: &anyhow::Error);
}

/// Reports failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
  fn report(&self, context: &str, err: &anyhow::Error) {
    error!(context, err = %format!("{:#}", err), "catalog: request failed");
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
  /// Nothing pending; the list reflects the last successful fetch.
  Idle,
  /// Timer armed, no request in flight that will be applied.
  Debouncing,
  /// A request is in flight.
  Loading,
  /// The last request failed. The list still holds the last good result.
  Error,
}

/// What applying one event did. Returned so the owner can react (status line,
/// selection clamping) without diffing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
  FetchIssued,
  VideosReplaced(usize),
  FetchFailed,
  OptionsLoaded,
  OptionsFailed,
  /// Stale timer or superseded response; no state changed.
  Discarded,
}

enum ControllerEvent {
  DebounceElapsed { generation: u64 },
  VideosFetched { seq: u64, result: Result<Vec<VideoSummary>> },
  OptionsFetched(Result<FilterOptions>),
}

pub struct FilterQueryController {
  source: Arc<dyn VideoSource>,
  diagnostics: Arc<dyn Diagnostics>,
  quiet_period: Duration,
  state: FilterState,
  options: FilterOptions,
  videos: Vec<VideoSummary>,
  phase: FetchPhase,
  last_error: Option<String>,
  options_error: Option<String>,
  last_query: Option<QueryParams>,
  /// Bumped on every edit; a timer firing for an older generation is stale.
  generation: u64,
  /// Sequence number of the most recently issued listing request.
  issued_seq: u64,
  debounce_handle: Option<JoinHandle<()>>,
  events_tx: mpsc::UnboundedSender<ControllerEvent>,
  events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
  disposed: bool,
}

impl FilterQueryController {
  pub fn new(source: Arc<dyn VideoSource>, diagnostics: Arc<dyn Diagnostics>, quiet_period: Duration) -> Self {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    Self {
      source,
      diagnostics,
      quiet_period,
      state: FilterState::default(),
      options: FilterOptions::default(),
      videos: Vec::new(),
      phase: FetchPhase::Idle,
      last_error: None,
      options_error: None,
      last_query: None,
      generation: 0,
      issued_seq: 0,
      debounce_handle: None,
      events_tx,
      events_rx,
      disposed: false,
    }
  }

  /// Seed the filters before [`start`](Self::start) without arming the timer.
  /// The language is applied first so a seeded accent can follow it.
  pub fn with_filters(mut self, filters: impl IntoIterator<Item = (FilterKey, String)>) -> Self {
    let mut filters: Vec<_> = filters.into_iter().collect();
    filters.sort_by_key(|(key, _)| *key != FilterKey::Language);
    for (key, value) in filters {
      self.state.set(key, value);
    }
    self
  }

  // --- Read access ---

  pub fn state(&self) -> &FilterState {
    &self.state
  }

  pub fn phase(&self) -> FetchPhase {
    self.phase
  }

  pub fn videos(&self) -> &[VideoSummary] {
    &self.videos
  }

  pub fn options(&self) -> &FilterOptions {
    &self.options
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn options_error(&self) -> Option<&str> {
    self.options_error.as_deref()
  }

  /// The parameters of the most recently issued listing request.
  pub fn last_query(&self) -> Option<&QueryParams> {
    self.last_query.as_ref()
  }

  /// Accents the user may pick under the current language.
  pub fn available_accents(&self) -> &[String] {
    self.options.accents_for(&self.state.language)
  }

  pub fn has_active_filters(&self) -> bool {
    !self.state.is_empty()
  }

  #[cfg(test)]
  pub fn is_disposed(&self) -> bool {
    self.disposed
  }

  // --- Operations ---

  /// Issue the initial listing fetch and the one-time options fetch. The two
  /// run independently; either may fail without affecting the other.
  pub fn start(&mut self) {
    if self.disposed {
      return;
    }
    info!(filters = ?self.state, "catalog: starting");
    self.execute_fetch(derive_query(&self.state));

    let fut = self.source.filter_options();
    let tx = self.events_tx.clone();
    tokio::spawn(async move {
      let _ = tx.send(ControllerEvent::OptionsFetched(fut.await));
    });
  }

  /// Change one facet and re-arm the debounce timer.
  pub fn set_filter(&mut self, key: FilterKey, value: impl Into<String>) {
    if self.disposed {
      debug!(%key, "catalog: edit after dispose ignored");
      return;
    }
    self.state.set(key, value);
    debug!(%key, value = self.state.get(key), "catalog: filter changed");
    self.schedule_fetch();
  }

  /// Reset every facet and re-arm the debounce timer.
  pub fn clear_all(&mut self) {
    if self.disposed {
      return;
    }
    self.state.clear();
    debug!("catalog: filters cleared");
    self.schedule_fetch();
  }

  /// Fetch the current filters now, cancelling any pending timer. Used as
  /// the manual retry after a failure.
  pub fn refresh(&mut self) {
    if self.disposed {
      return;
    }
    self.cancel_timer();
    self.generation += 1;
    self.execute_fetch(derive_query(&self.state));
  }

  /// Empty the displayed list. Only ever user-triggered.
  pub fn reset_videos(&mut self) {
    if self.disposed {
      return;
    }
    self.videos.clear();
  }

  /// Cancel the pending timer and stop applying anything still in flight.
  /// Idempotent; also run on drop.
  pub fn dispose(&mut self) {
    if self.disposed {
      return;
    }
    self.cancel_timer();
    self.disposed = true;
    self.events_rx.close();
    debug!(issued = self.issued_seq, "catalog: controller disposed");
  }

  /// Apply every event that has already arrived. Never blocks.
  pub fn poll(&mut self) -> Vec<Update> {
    let mut updates = Vec::new();
    if self.disposed {
      return updates;
    }
    while let Ok(event) = self.events_rx.try_recv() {
      updates.push(self.apply(event));
    }
    updates
  }

  /// Wait for the next event and apply it. `None` once disposed.
  #[cfg(test)]
  pub async fn next_event(&mut self) -> Option<Update> {
    if self.disposed {
      return None;
    }
    let event = self.events_rx.recv().await?;
    Some(self.apply(event))
  }

  // --- Internals ---

  fn cancel_timer(&mut self) {
    if let Some(handle) = self.debounce_handle.take() {
      handle.abort();
    }
  }

  /// Replace any pending timer with a fresh one measured from now.
  fn schedule_fetch(&mut self) {
    self.cancel_timer();
    self.generation += 1;
    self.phase = FetchPhase::Debouncing;

    let generation = self.generation;
    let deadline = Instant::now() + self.quiet_period;
    let tx = self.events_tx.clone();
    self.debounce_handle = Some(tokio::spawn(async move {
      tokio::time::sleep_until(deadline).await;
      let _ = tx.send(ControllerEvent::DebounceElapsed { generation });
    }));
  }

  fn execute_fetch(&mut self, query: QueryParams) {
    self.issued_seq += 1;
    let seq = self.issued_seq;
    self.phase = FetchPhase::Loading;
    info!(seq, ?query, "catalog: fetching videos");

    let fut = self.source.list_videos(query.clone());
    self.last_query = Some(query);
    let tx = self.events_tx.clone();
    tokio::spawn(async move {
      let result = fut.await;
      let _ = tx.send(ControllerEvent::VideosFetched { seq, result });
    });
  }

  fn apply(&mut self, event: ControllerEvent) -> Update {
    match event {
      ControllerEvent::DebounceElapsed { generation } => {
        if generation != self.generation || self.phase != FetchPhase::Debouncing {
          debug!(generation, current = self.generation, "catalog: stale debounce timer");
          return Update::Discarded;
        }
        self.debounce_handle = None;
        self.execute_fetch(derive_query(&self.state));
        Update::FetchIssued
      }
      ControllerEvent::VideosFetched { seq, result } => {
        if seq != self.issued_seq || self.phase != FetchPhase::Loading {
          debug!(seq, latest = self.issued_seq, ok = result.is_ok(), "catalog: superseded response dropped");
          return Update::Discarded;
        }
        match result {
          Ok(videos) => {
            info!(seq, count = videos.len(), "catalog: videos loaded");
            self.videos = videos;
            self.phase = FetchPhase::Idle;
            self.last_error = None;
            Update::VideosReplaced(self.videos.len())
          }
          Err(e) => {
            self.diagnostics.report("list videos", &e);
            self.last_error = Some(format!("{:#}", e));
            self.phase = FetchPhase::Error;
            Update::FetchFailed
          }
        }
      }
      ControllerEvent::OptionsFetched(result) => match result {
        Ok(options) => {
          info!(
            levels = options.levels.len(),
            topics = options.topics.len(),
            languages = options.accents_data.len(),
            "catalog: filter options loaded"
          );
          self.options = options;
          self.options_error = None;
          Update::OptionsLoaded
        }
        Err(e) => {
          self.diagnostics.report("load filter options", &e);
          self.options_error = Some(format!("{:#}", e));
          Update::OptionsFailed
        }
      },
    }
  }
}

impl Drop for FilterQueryController {
  fn drop(&mut self) {
    self.dispose();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::FutureExt;
  use std::collections::BTreeMap;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicBool, Ordering};
  use tokio::sync::oneshot;

  use crate::models::LanguageAccents;

  const QUIET: Duration = Duration::from_millis(500);

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  fn video(id: &str) -> VideoSummary {
    serde_json::from_value(serde_json::json!({"video_id": id, "title": format!("Video {}", id)})).unwrap()
  }

  type Responder = oneshot::Sender<Result<Vec<VideoSummary>>>;

  /// Listing source that either answers at once or hands the test a
  /// responder per call so it can choose resolution order.
  #[derive(Default)]
  struct FakeSource {
    manual: bool,
    fail_videos: AtomicBool,
    fail_options: AtomicBool,
    calls: Mutex<Vec<(Instant, QueryParams)>>,
    pending: Mutex<Vec<Option<Responder>>>,
  }

  impl FakeSource {
    fn immediate() -> Arc<Self> {
      Arc::new(Self::default())
    }

    fn manual() -> Arc<Self> {
      Arc::new(Self { manual: true, ..Default::default() })
    }

    fn calls(&self) -> Vec<(Instant, QueryParams)> {
      self.calls.lock().unwrap().clone()
    }

    fn resolve(&self, call: usize, result: Result<Vec<VideoSummary>>) {
      let responder = self.pending.lock().unwrap()[call].take().expect("call already resolved");
      let _ = responder.send(result);
    }
  }

  impl VideoSource for FakeSource {
    fn list_videos(&self, query: QueryParams) -> BoxFuture<'static, Result<Vec<VideoSummary>>> {
      let label = query.values().cloned().collect::<Vec<_>>().join("+");
      self.calls.lock().unwrap().push((Instant::now(), query));
      if self.manual {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(Some(tx));
        return async move { rx.await.map_err(|_| anyhow::anyhow!("responder dropped"))? }.boxed();
      }
      let fail = self.fail_videos.load(Ordering::SeqCst);
      async move {
        if fail { Err(anyhow::anyhow!("HTTP 502")) } else { Ok(vec![video(&format!("all{}", label))]) }
      }
      .boxed()
    }

    fn filter_options(&self) -> BoxFuture<'static, Result<FilterOptions>> {
      let fail = self.fail_options.load(Ordering::SeqCst);
      async move {
        if fail {
          return Err(anyhow::anyhow!("options unavailable"));
        }
        let mut accents_data = BTreeMap::new();
        accents_data.insert(
          "en".to_string(),
          LanguageAccents { label: "English".to_string(), accents: vec!["US".to_string(), "British".to_string()] },
        );
        Ok(FilterOptions { levels: vec!["A1".to_string(), "B1".to_string()], accents_data, ..Default::default() })
      }
      .boxed()
    }
  }

  #[derive(Default)]
  struct RecordingDiagnostics {
    reports: Mutex<Vec<String>>,
  }

  impl RecordingDiagnostics {
    fn reports(&self) -> Vec<String> {
      self.reports.lock().unwrap().clone()
    }
  }

  impl Diagnostics for RecordingDiagnostics {
    fn report(&self, context: &str, err: &anyhow::Error) {
      self.reports.lock().unwrap().push(format!("{}: {}", context, err));
    }
  }

  fn controller(source: Arc<FakeSource>) -> (FilterQueryController, Arc<RecordingDiagnostics>) {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let c = FilterQueryController::new(source, diagnostics.clone(), QUIET);
    (c, diagnostics)
  }

  fn query(pairs: &[(&'static str, &str)]) -> QueryParams {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
  }

  // --- Dependent fields ---

  #[tokio::test(start_paused = true)]
  async fn accent_never_outlives_language() {
    let (mut c, _) = controller(FakeSource::immediate());
    let edits = [
      (FilterKey::Language, "en"),
      (FilterKey::Accent, "British"),
      (FilterKey::Level, "B2"),
      (FilterKey::Language, ""),
      (FilterKey::Topic, "Travel"),
      (FilterKey::Language, "fr"),
      (FilterKey::Search, "bonjour"),
    ];
    for (key, value) in edits {
      c.set_filter(key, value);
      if c.state().language.is_empty() {
        assert!(c.state().accent.is_empty(), "accent left set after {:?}", key);
      }
    }
  }

  #[tokio::test(start_paused = true)]
  async fn accent_edit_without_language_is_ignored() {
    let (mut c, _) = controller(FakeSource::immediate());
    c.set_filter(FilterKey::Accent, "British");
    assert_eq!(c.state().accent, "");
    assert_eq!(c.state().language, "");
  }

  #[tokio::test(start_paused = true)]
  async fn seeded_accent_needs_seeded_language() {
    let source = FakeSource::immediate();
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let mut c = FilterQueryController::new(source.clone(), diagnostics.clone(), QUIET)
      .with_filters([(FilterKey::Accent, "US".to_string())]);
    assert_eq!(c.state().accent, "");
    c.start();
    assert_eq!(source.calls()[0].1, QueryParams::new());

    let c = FilterQueryController::new(source, diagnostics, QUIET)
      .with_filters([(FilterKey::Accent, "US".to_string()), (FilterKey::Language, "en".to_string())]);
    assert_eq!(c.state().language, "en");
    assert_eq!(c.state().accent, "US");
  }

  #[tokio::test(start_paused = true)]
  async fn switching_language_drops_accent() {
    let (mut c, _) = controller(FakeSource::immediate());
    c.set_filter(FilterKey::Language, "en");
    c.set_filter(FilterKey::Accent, "British");
    c.set_filter(FilterKey::Language, "fr");
    assert_eq!(c.state().language, "fr");
    assert_eq!(c.state().accent, "");
  }

  #[tokio::test(start_paused = true)]
  async fn clear_all_derives_startup_query() {
    let (mut c, _) = controller(FakeSource::immediate());
    c.set_filter(FilterKey::Level, "C1");
    c.set_filter(FilterKey::Search, "news");
    c.clear_all();
    assert!(derive_query(c.state()).is_empty());
    assert_eq!(c.phase(), FetchPhase::Debouncing);
    assert!(!c.has_active_filters());
  }

  #[tokio::test(start_paused = true)]
  async fn accents_offered_follow_language() {
    let (mut c, _) = controller(FakeSource::immediate());
    c.start();
    while c.options().accents_data.is_empty() {
      c.next_event().await.unwrap();
    }
    assert!(c.available_accents().is_empty());
    c.set_filter(FilterKey::Language, "en");
    assert_eq!(c.available_accents(), ["US", "British"]);
    c.set_filter(FilterKey::Language, "de");
    assert!(c.available_accents().is_empty());
  }

  // --- Debounce ---

  #[tokio::test(start_paused = true)]
  async fn burst_of_edits_fetches_once_with_final_state() {
    let source = FakeSource::immediate();
    let (mut c, _) = controller(source.clone());
    let t0 = Instant::now();

    c.set_filter(FilterKey::Level, "A1");
    tokio::time::advance(ms(100)).await;
    c.set_filter(FilterKey::Level, "B1");
    tokio::time::advance(ms(100)).await;
    c.set_filter(FilterKey::Topic, "Travel");
    assert!(source.calls().is_empty());

    assert_eq!(c.next_event().await, Some(Update::FetchIssued));
    assert_eq!(c.next_event().await, Some(Update::VideosReplaced(1)));

    let calls = source.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0 - t0 >= ms(700));
    assert_eq!(calls[0].1, query(&[("level", "B1"), ("topic", "Travel")]));
    assert_eq!(c.phase(), FetchPhase::Idle);
    assert_eq!(c.last_query(), Some(&query(&[("level", "B1"), ("topic", "Travel")])));
  }

  #[tokio::test(start_paused = true)]
  async fn spaced_edits_fetch_each_time() {
    let source = FakeSource::immediate();
    let (mut c, _) = controller(source.clone());

    c.set_filter(FilterKey::Level, "A1");
    assert_eq!(c.next_event().await, Some(Update::FetchIssued));
    assert_eq!(c.next_event().await, Some(Update::VideosReplaced(1)));
    c.set_filter(FilterKey::Level, "A2");
    assert_eq!(c.next_event().await, Some(Update::FetchIssued));
    assert_eq!(c.next_event().await, Some(Update::VideosReplaced(1)));

    let calls = source.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1, query(&[("level", "A2")]));
  }

  #[tokio::test(start_paused = true)]
  async fn unset_filters_are_not_sent() {
    let source = FakeSource::immediate();
    let (mut c, _) = controller(source.clone());
    c.set_filter(FilterKey::Search, "weather");
    c.set_filter(FilterKey::Type, "Podcast");
    c.set_filter(FilterKey::Search, "");
    c.next_event().await;
    assert_eq!(source.calls()[0].1, query(&[("content_types", "Podcast")]));
  }

  // --- Ordering ---

  #[tokio::test(start_paused = true)]
  async fn later_request_wins_when_earlier_resolves_last() {
    let source = FakeSource::manual();
    let (mut c, _) = controller(source.clone());

    c.set_filter(FilterKey::Level, "B1");
    assert_eq!(c.next_event().await, Some(Update::FetchIssued));
    c.set_filter(FilterKey::Level, "B2");
    assert_eq!(c.next_event().await, Some(Update::FetchIssued));
    assert_eq!(source.calls().len(), 2);

    source.resolve(1, Ok(vec![video("b2-a"), video("b2-b")]));
    assert_eq!(c.next_event().await, Some(Update::VideosReplaced(2)));
    source.resolve(0, Ok(vec![video("b1")]));
    assert_eq!(c.next_event().await, Some(Update::Discarded));

    let ids: Vec<_> = c.videos().iter().map(|v| v.video_id.as_str()).collect();
    assert_eq!(ids, ["b2-a", "b2-b"]);
    assert_eq!(c.phase(), FetchPhase::Idle);
  }

  #[tokio::test(start_paused = true)]
  async fn earlier_response_arriving_first_is_still_dropped() {
    let source = FakeSource::manual();
    let (mut c, _) = controller(source.clone());

    c.set_filter(FilterKey::Level, "B1");
    c.next_event().await;
    c.set_filter(FilterKey::Level, "B2");
    c.next_event().await;

    source.resolve(0, Ok(vec![video("b1")]));
    assert_eq!(c.next_event().await, Some(Update::Discarded));
    assert!(c.videos().is_empty());
    assert_eq!(c.phase(), FetchPhase::Loading);

    source.resolve(1, Ok(vec![video("b2")]));
    assert_eq!(c.next_event().await, Some(Update::VideosReplaced(1)));
    assert_eq!(c.videos()[0].video_id, "b2");
  }

  #[tokio::test(start_paused = true)]
  async fn edit_while_loading_supersedes_in_flight_request() {
    let source = FakeSource::manual();
    let (mut c, _) = controller(source.clone());

    c.set_filter(FilterKey::Topic, "Food");
    c.next_event().await;
    assert_eq!(c.phase(), FetchPhase::Loading);
    c.set_filter(FilterKey::Topic, "Sport");
    assert_eq!(c.phase(), FetchPhase::Debouncing);

    source.resolve(0, Ok(vec![video("food")]));
    assert_eq!(c.next_event().await, Some(Update::Discarded));
    assert!(c.videos().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn server_order_is_kept_verbatim() {
    let source = FakeSource::manual();
    let (mut c, _) = controller(source.clone());
    c.refresh();
    source.resolve(0, Ok(vec![video("z"), video("a"), video("z"), video("m")]));
    c.next_event().await;
    let ids: Vec<_> = c.videos().iter().map(|v| v.video_id.as_str()).collect();
    assert_eq!(ids, ["z", "a", "z", "m"]);
  }

  // --- Failures ---

  #[tokio::test(start_paused = true)]
  async fn failed_fetch_keeps_last_good_list() {
    let source = FakeSource::immediate();
    let (mut c, diagnostics) = controller(source.clone());

    c.refresh();
    assert_eq!(c.next_event().await, Some(Update::VideosReplaced(1)));
    let before = c.videos().to_vec();

    source.fail_videos.store(true, Ordering::SeqCst);
    c.set_filter(FilterKey::Level, "C2");
    assert_eq!(c.next_event().await, Some(Update::FetchIssued));
    assert_eq!(c.next_event().await, Some(Update::FetchFailed));

    assert_eq!(c.videos(), before.as_slice());
    assert_eq!(c.phase(), FetchPhase::Error);
    assert!(c.last_error().unwrap().contains("502"));
    assert_eq!(diagnostics.reports(), ["list videos: HTTP 502"]);

    tokio::time::advance(ms(5_000)).await;
    assert!(c.poll().is_empty());
    assert_eq!(source.calls().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn controller_recovers_after_failure() {
    let source = FakeSource::immediate();
    let (mut c, _) = controller(source.clone());

    source.fail_videos.store(true, Ordering::SeqCst);
    c.refresh();
    assert_eq!(c.next_event().await, Some(Update::FetchFailed));

    source.fail_videos.store(false, Ordering::SeqCst);
    c.set_filter(FilterKey::Level, "A2");
    assert_eq!(c.phase(), FetchPhase::Debouncing);
    c.next_event().await;
    assert_eq!(c.next_event().await, Some(Update::VideosReplaced(1)));
    assert_eq!(c.phase(), FetchPhase::Idle);
    assert_eq!(c.last_error(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn manual_retry_after_error_refetches_current_filters() {
    let source = FakeSource::immediate();
    let (mut c, _) = controller(source.clone());
    c.set_filter(FilterKey::Channel, "Easy French");
    source.fail_videos.store(true, Ordering::SeqCst);
    c.next_event().await;
    assert_eq!(c.next_event().await, Some(Update::FetchFailed));

    source.fail_videos.store(false, Ordering::SeqCst);
    c.refresh();
    assert_eq!(c.phase(), FetchPhase::Loading);
    assert_eq!(c.next_event().await, Some(Update::VideosReplaced(1)));
    assert_eq!(source.calls()[1].1, query(&[("channel", "Easy French")]));
  }

  #[tokio::test(start_paused = true)]
  async fn options_failure_does_not_block_listing() {
    let source = FakeSource::immediate();
    source.fail_options.store(true, Ordering::SeqCst);
    let (mut c, diagnostics) = controller(source.clone());

    c.start();
    assert_eq!(c.phase(), FetchPhase::Loading);
    let mut seen = vec![c.next_event().await.unwrap(), c.next_event().await.unwrap()];
    seen.sort_by_key(|u| format!("{:?}", u));
    assert_eq!(seen, [Update::OptionsFailed, Update::VideosReplaced(1)]);
    assert_eq!(c.phase(), FetchPhase::Idle);
    assert!(c.options_error().is_some());
    assert_eq!(diagnostics.reports().len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn listing_failure_keeps_options() {
    let source = FakeSource::immediate();
    source.fail_videos.store(true, Ordering::SeqCst);
    let (mut c, _) = controller(source.clone());

    c.start();
    c.next_event().await;
    c.next_event().await;
    assert_eq!(c.phase(), FetchPhase::Error);
    assert_eq!(c.options().levels, ["A1", "B1"]);
    assert_eq!(c.options_error(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn start_uses_seeded_filters() {
    let source = FakeSource::immediate();
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let mut c = FilterQueryController::new(source.clone(), diagnostics, QUIET)
      .with_filters([(FilterKey::Language, "en".to_string()), (FilterKey::Search, "pizza".to_string())]);
    assert_eq!(c.phase(), FetchPhase::Idle);
    c.start();
    assert_eq!(source.calls()[0].1, query(&[("language", "en"), ("title", "pizza")]));
  }

  // --- Teardown ---

  #[tokio::test(start_paused = true)]
  async fn dispose_ignores_in_flight_response() {
    let source = FakeSource::manual();
    let (mut c, diagnostics) = controller(source.clone());

    c.set_filter(FilterKey::Level, "B1");
    assert_eq!(c.next_event().await, Some(Update::FetchIssued));
    c.dispose();

    source.resolve(0, Ok(vec![video("late")]));
    for _ in 0..5 {
      tokio::task::yield_now().await;
    }
    assert!(c.poll().is_empty());
    assert_eq!(c.next_event().await, None);
    assert!(c.videos().is_empty());
    assert_eq!(c.phase(), FetchPhase::Loading);
    assert!(diagnostics.reports().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn dispose_cancels_pending_timer() {
    let source = FakeSource::immediate();
    let (mut c, _) = controller(source.clone());

    c.set_filter(FilterKey::Topic, "Music");
    c.dispose();
    tokio::time::advance(ms(2_000)).await;
    tokio::task::yield_now().await;

    assert!(source.calls().is_empty());
    c.set_filter(FilterKey::Topic, "Cinema");
    assert_eq!(c.state().topic, "Music");
    assert!(c.is_disposed());
  }

  #[tokio::test(start_paused = true)]
  async fn reset_videos_only_on_request() {
    let source = FakeSource::immediate();
    let (mut c, _) = controller(source);
    c.refresh();
    c.next_event().await;
    assert_eq!(c.videos().len(), 1);
    c.reset_videos();
    assert!(c.videos().is_empty());
  }
}
