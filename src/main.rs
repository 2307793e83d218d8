use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tasklist::app::App;
use tasklist::config::Config;
use tasklist::storage::{FileStorage, Storage};
use tasklist::task_store::TaskStore;
use tasklist::{logging, ui};
use tracing::{error, info};

const IDLE_POLL: Duration = Duration::from_millis(250);

/// Terminal task list with pending, in-progress and completed tasks.
#[derive(Debug, Parser)]
#[command(name = "tasklist", version, about)]
struct Cli {
    /// Config file (defaults to the per-user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding tasks.json and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    let _guard = logging::init_logging(&config.log_dir(), &config.log_level)?;
    info!(?config, "starting");

    let storage = FileStorage::open(&config.data_dir)
        .with_context(|| format!("failed to open {}", config.data_dir.display()))?;
    let store = TaskStore::hydrate(storage, config.id_policy);
    let mut app = App::new(store, config.menu_hide_after());

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "event loop failed");
    }
    info!(tasks = app.store.len(), "exiting");
    result.context("terminal event loop failed")
}

fn run_app<B: Backend, S: Storage>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    while !app.should_quit {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = app
            .menu
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()).min(IDLE_POLL))
            .unwrap_or(IDLE_POLL);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key, Instant::now());
                }
            }
        }
        app.tick(Instant::now());
    }
    Ok(())
}
