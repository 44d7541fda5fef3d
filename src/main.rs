use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use holocron::app::App;
use holocron::cache::QueryCache;
use holocron::config::Config;
use holocron::paths;
use holocron::state::{Location, NavigationState};
use holocron::swapi::CatalogClient;

#[derive(Parser, Debug)]
#[command(name = "holocron", about = "Terminal browser for the Star Wars API catalog")]
struct Args {
    /// Start at a location printed by a previous session, e.g. "/people/1?tab=people&page=3"
    #[arg(long, value_name = "LOCATION")]
    location: Option<String>,

    /// Config file (default: platform config dir)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Catalog API root, overriding the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Log file (default: platform cache dir)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Send tracing output to a file; the terminal belongs to the TUI.
fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path.or_else(paths::log_path) else {
        return Ok(());
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("holocron=info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.clone())?;

    let config = match args.config.clone().or_else(paths::config_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    let base_url = args.base_url.as_deref().unwrap_or(&config.base_url);

    let client = CatalogClient::new(base_url, config.request_timeout())
        .with_context(|| format!("Invalid catalog URL {:?}", base_url))?;

    let nav = match &args.location {
        Some(raw) => {
            let location: Location = raw
                .parse()
                .with_context(|| format!("Invalid location {:?}", raw))?;
            NavigationState::from_location(&location, |category, id| {
                client.address_for(category, id)
            })?
        }
        None => NavigationState::default(),
    };

    let (settled_tx, settled_rx) = mpsc::unbounded_channel();
    let cache = QueryCache::with_capacity(client, config.max_cached_pages)
        .with_policy(config.freshness())
        .with_retry(config.retry())
        .with_notifier(settled_tx);

    tracing::info!(base_url, location = %nav.location(), "Starting holocron");

    // Install panic hook BEFORE setting up terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal().context("Failed to set up terminal")?;
    let mut app = App::new(cache, nav);
    let result = app.run(&mut terminal, settled_rx).await;
    restore_terminal(terminal).context("Failed to restore terminal")?;
    result.context("Event loop failed")?;

    let location = app.nav.location();
    tracing::info!(%location, "Exiting");
    println!("{}", location);
    Ok(())
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
