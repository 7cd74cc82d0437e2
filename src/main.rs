mod app;
mod config;
mod constants;
mod dashboard;
mod error;
mod focus;
mod grid;
mod input;
mod persistence;
mod reference;
mod registry;
mod search;
mod theme;
mod ui;
mod youtube;

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use constants::constants;
use dashboard::Dashboard;
use error::GridError;
use persistence::{JsonFileStore, SnapshotStore};
use reference::ContentKind;
use registry::{ChannelPatch, NewChannel};
use youtube::{NameLookup, YouTubeClient};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "A grid of YouTube players in the terminal", long_about = None)]
struct Args {
  /// YouTube Data API key for name lookup and search (default: $YOUTUBE_API_KEY)
  #[arg(long, global = true)]
  api_key: Option<String>,

  /// Snapshot file to use instead of the one in the platform data directory
  #[arg(long, global = true, value_name = "PATH")]
  state: Option<PathBuf>,

  /// Discard persisted state and start from the defaults
  #[arg(long, global = true)]
  reset: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print shell completions
  Completions { shell: clap_complete::Shell },
  #[command(flatten)]
  State(StateCommand),
}

/// Headless operations on the persisted dashboard.
#[derive(Subcommand, Debug)]
enum StateCommand {
  /// Save a channel from a YouTube URL or ID
  Add {
    url: String,
    /// Display name (skips the title lookup)
    #[arg(long)]
    name: Option<String>,
    /// Override the inferred kind: video, live, playlist or channel
    #[arg(long, value_parser = parse_kind)]
    kind: Option<ContentKind>,
  },
  /// Change the name, URL or kind of a saved channel
  Edit {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long, value_parser = parse_kind)]
    kind: Option<ContentKind>,
  },
  /// Remove a saved channel and clear it from every cell
  Remove { id: String },
  /// Show saved channels and the grid
  List,
  /// Switch the grid to a column preset (4, 6, 8, 9 or 12)
  Columns {
    #[arg(value_parser = clap::value_parser!(u32).range(1..=grid::MAX_COLUMNS as i64))]
    cols: u32,
  },
  /// Show a saved channel in a cell
  Assign { cell: String, id: String },
  /// Empty a cell
  Clear { cell: String },
}

fn parse_kind(s: &str) -> Result<ContentKind, String> {
  ContentKind::from_label(s).ok_or_else(|| format!("unknown kind '{}'", s))
}

// --- Logging ---

/// Log to a file in the data directory; the terminal belongs to the UI.
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let c = constants();
  let dirs = ProjectDirs::from("", "", &c.project_name).ok_or_else(|| anyhow!("No home directory found"))?;
  let log_dir = dirs.data_dir();
  std::fs::create_dir_all(log_dir).with_context(|| format!("Failed to create {}", log_dir.display()))?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, &c.log_file));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_writer(writer).with_env_filter(filter).with_ansi(false).init();
  Ok(guard)
}

// --- Headless commands ---

fn describe<S: SnapshotStore>(dashboard: &Dashboard<S>) -> String {
  let mut out = String::new();
  let registry = dashboard.registry();
  let _ = writeln!(out, "Channels ({}):", registry.len());
  for channel in registry.channels() {
    let _ = writeln!(out, "  {:<26} {:<9} {}", channel.id, channel.kind.label(), channel.name);
  }
  let grid = dashboard.grid();
  let _ = writeln!(out, "Grid ({} columns):", grid.cols());
  for cell in grid.layout() {
    let content = grid.content_of(&cell.id).unwrap_or("(empty)");
    let _ = writeln!(out, "  {:<8} {}x{} at {},{}  {}", cell.id, cell.w, cell.h, cell.x, cell.y, content);
  }
  out
}

async fn run_command<S: SnapshotStore>(
  command: StateCommand,
  dashboard: &mut Dashboard<S>,
  client: &YouTubeClient,
) -> Result<()> {
  match command {
    StateCommand::Add { url, name, kind } => {
      let reservation = dashboard.add_channel(NewChannel { url, name, kind })?;
      let id = reservation.channel.id;
      if let Some(request) = reservation.lookup {
        let result = client.lookup_name(&request.id, request.kind).await;
        if let Err(e) = &result {
          warn!(id = %request.id, err = %e, "lookup: keeping placeholder name");
        }
        dashboard.complete_name_lookup(&request.id, result);
      }
      if let Some(channel) = dashboard.registry().get(&id) {
        println!("Added {} ({}) as '{}'", channel.id, channel.kind.label(), channel.name);
      }
    }
    StateCommand::Edit { id, name, url, kind } => {
      dashboard.update_channel(&id, ChannelPatch { url, name, kind })?;
      if let Some(channel) = dashboard.registry().get(&id) {
        println!("{} is now '{}' ({}, {})", channel.id, channel.name, channel.kind.label(), channel.url);
      }
    }
    StateCommand::Remove { id } => {
      let removed = dashboard.remove_channel(&id)?;
      println!("Removed {} ('{}')", removed.id, removed.name);
    }
    StateCommand::List => print!("{}", describe(dashboard)),
    StateCommand::Columns { cols } => match dashboard.set_columns(cols) {
      Ok(()) => println!("Grid set to {} columns", cols),
      Err(e @ GridError::ConfigurationMissing(_)) => eprintln!("warning: {}", e),
      Err(e) => return Err(e.into()),
    },
    StateCommand::Assign { cell, id } => {
      dashboard.assign_to_cell(&cell, &id)?;
      println!("{} now shows {}", cell, id);
    }
    StateCommand::Clear { cell } => {
      dashboard.clear_cell(&cell)?;
      println!("Cleared {}", cell);
    }
  }
  Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(Command::Completions { shell }) = args.command {
    clap_complete::generate(shell, &mut Args::command(), "ytgrid", &mut std::io::stdout());
    return Ok(());
  }

  let _guard = match init_logging() {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("warning: logging disabled: {:#}", e);
      None
    }
  };

  let path = match args.state {
    Some(path) => path,
    None => JsonFileStore::default_path()?,
  };
  let store = JsonFileStore::new(path);
  if args.reset {
    store.discard()?;
    info!(path = %store.path().display(), "state discarded");
  }
  let client = YouTubeClient::new(args.api_key.or_else(|| std::env::var("YOUTUBE_API_KEY").ok()));
  let mut dashboard = Dashboard::open(store);

  if let Some(Command::State(command)) = args.command {
    return run_command(command, &mut dashboard, &client).await;
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let app = App::new(dashboard, client, Config::load());
  let mut terminal = ratatui::init();
  let result = run(&mut terminal, app);
  ratatui::restore();
  result
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  info!(key = app.has_api_key(), "dashboard started");

  loop {
    app.check_pending();
    app.expire_notifications();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(&mut app, key),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("dashboard closed");
  Ok(())
}
