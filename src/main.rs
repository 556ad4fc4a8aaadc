mod admin;
mod api;
mod app;
mod config;
mod constants;
mod controller;
mod detail;
mod filters;
mod input;
mod models;
mod theme;
mod ui;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use admin::VideoForm;
use api::ApiClient;
use app::App;
use config::Config;
use filters::FilterKey;
use models::CefrLevel;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Catalog API base URL (overrides the saved one)
  #[arg(long, global = true)]
  api_url: Option<String>,

  /// Admin key for write operations (overrides the saved one)
  #[arg(long, global = true)]
  admin_key: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Browse the library interactively (default)
  Browse {
    /// Start with a filter set, e.g. `--filter level=B1 --filter language=en`
    #[arg(short, long = "filter", value_parser = filters::parse_assignment)]
    filters: Vec<(FilterKey, String)>,
  },
  /// Print one video's details, summary and vocabulary
  Video {
    /// Video id or YouTube URL
    video_id: String,
    /// Show the transcript line spoken at this many seconds
    #[arg(long)]
    at: Option<f64>,
  },
  /// Add a single video (admin)
  Add {
    video_id: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    url: String,
    #[arg(long)]
    channel: Option<String>,
    #[arg(long, default_value = "B1")]
    level: CefrLevel,
    #[arg(long, default_value = "en")]
    language: String,
    /// Comma-separated topics
    #[arg(long, default_value = "")]
    topics: String,
    /// Comma-separated accents
    #[arg(long, default_value = "")]
    accents: String,
    /// Comma-separated content types
    #[arg(long, default_value = "")]
    content_types: String,
  },
  /// Upload a JSON list of videos (admin)
  Batch {
    file: PathBuf,
    /// Validate the file without uploading
    #[arg(long)]
    dry_run: bool,
  },
  /// Delete a video (admin)
  Delete { video_id: String },
  /// Save the admin key; omit it to forget the saved key
  SetKey { key: Option<String> },
  /// Save the catalog API base URL; omit it to go back to the default
  SetApi { url: Option<String> },
  /// Print shell completions
  Completions { shell: clap_complete::Shell },
}

// --- Logging ---

fn env_filter(default: &str) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// The TUI owns the terminal, so logs go to a daily file. The guard must
/// live until exit or buffered lines are lost.
fn init_file_logging() -> Option<WorkerGuard> {
  let dir = config::log_dir()?;
  std::fs::create_dir_all(&dir).ok()?;
  let appender = tracing_appender::rolling::daily(dir, "lingoreel.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  tracing_subscriber::fmt().with_env_filter(env_filter("lingoreel=info")).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

fn init_stderr_logging() {
  tracing_subscriber::fmt().with_env_filter(env_filter("lingoreel=warn")).with_writer(std::io::stderr).init();
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let mut config = Config::load();

  let api_url = args.api_url.clone().unwrap_or_else(|| config.api_url());
  let admin_key = args.admin_key.clone().or_else(|| config.admin_key().map(str::to_string));

  let command = args.command.unwrap_or(Command::Browse { filters: Vec::new() });
  if !matches!(command, Command::Browse { .. }) {
    init_stderr_logging();
  }
  match command {
    Command::Browse { filters } => {
      let _guard = init_file_logging();
      let api = ApiClient::new(&api_url, admin_key.as_deref())?;
      info!(api = %api.base_url(), filters = filters.len(), "starting browser");
      let mut app = App::new(config, api, filters);
      app.has_admin_key = admin_key.is_some();

      let default_hook = std::panic::take_hook();
      std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        default_hook(info);
      }));

      let mut terminal = ratatui::init();
      let result = run(&mut terminal, app).await;
      ratatui::restore();
      return result;
    }
    Command::Completions { shell } => {
      clap_complete::generate(shell, &mut Args::command(), env!("CARGO_PKG_NAME"), &mut std::io::stdout());
    }
    Command::SetKey { key } => {
      config.admin_key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
      config.save()?;
      println!("{}", if config.admin_key.is_some() { "Admin key saved." } else { "Admin key cleared." });
    }
    Command::SetApi { url } => {
      config.api_url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
      config.save()?;
      println!("Catalog API: {}", config.api_url());
    }
    Command::Video { video_id, at } => {
      let api = ApiClient::new(&api_url, admin_key.as_deref())?;
      print_video(&api.video(detail::extract_video_id(&video_id)).await?, at);
    }
    Command::Add { video_id, title, url, channel, level, language, topics, accents, content_types } => {
      let api = admin_client(&api_url, admin_key.as_deref())?;
      let form = VideoForm {
        video_id,
        title,
        url,
        channel_name: channel.unwrap_or_default(),
        level,
        language,
        topics,
        accents,
        content_types,
      };
      let created = admin::submit_video(&api, &form).await?;
      println!("Created {} ({})", created.title, created.video_id);
    }
    Command::Batch { file, dry_run } => {
      let videos = admin::load_batch(&file).context("batch rejected")?;
      if dry_run {
        println!("{} videos ready to upload.", videos.len());
        return Ok(());
      }
      let api = admin_client(&api_url, admin_key.as_deref())?;
      let outcome = admin::upload_batch(&api, &videos).await?;
      println!("{}: {} created, {} ignored.", outcome.status, outcome.created, outcome.ignored);
    }
    Command::Delete { video_id } => {
      let api = admin_client(&api_url, admin_key.as_deref())?;
      api.delete_video(&video_id).await?;
      println!("Deleted {}", video_id);
    }
  }
  Ok(())
}

fn admin_client(api_url: &str, admin_key: Option<&str>) -> Result<ApiClient> {
  if admin_key.is_none() {
    bail!("no admin key set; pass --admin-key or run `lingoreel set-key <key>`");
  }
  ApiClient::new(api_url, admin_key)
}

fn print_video(video: &models::VideoDetail, at: Option<f64>) {
  let v = &video.summary;
  println!("{}", v.title);
  if let Some(channel) = &v.channel_name {
    println!("  channel   {}", channel);
  }
  println!("  level     {}", v.level.map_or_else(|| "N/A".to_string(), |l| l.to_string()));
  println!("  language  {}", v.language.as_deref().unwrap_or("-"));
  println!("  speed     {} WPM", v.wpm);
  println!("  duration  {}", detail::format_duration(video.duration_seconds));
  if !v.topics.is_empty() {
    println!("  topics    {}", v.topics.join(", "));
  }
  println!("  watch     {}", detail::watch_url(&v.video_id, None));

  let analysis = &video.ai_analysis;
  if let Some(summary) = &analysis.transcript_summary {
    println!("\n{}", summary);
  }
  if !analysis.vocabulary.is_empty() {
    println!("\nVocabulary");
    for item in &analysis.vocabulary {
      println!("  {:<20} {}", item.term, item.definition);
    }
  }
  if !analysis.grammar_stats.is_empty() {
    println!("\nGrammar");
    for (key, value) in &analysis.grammar_stats {
      println!("  {:<24} {}", detail::grammar_label(key), detail::grammar_value(value));
    }
  }
  let lines = &video.transcript_json;
  match at {
    Some(position) => match detail::line_at(lines, position) {
      Some(i) => {
        println!("\n[{}] {}", detail::format_timestamp(lines[i].start), lines[i].text);
        println!("{}", detail::watch_url(&v.video_id, Some(lines[i].start)));
      }
      None => println!("\nNo transcript line at {}.", detail::format_timestamp(position)),
    },
    None => println!("\n{} transcript lines", lines.len()),
  }
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  app.catalog.start();

  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(50))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(&mut app, key),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.catalog.dispose();
  Ok(())
}
