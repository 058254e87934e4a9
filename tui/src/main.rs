//! ActionQ TUI Entry Point
//!
//! Launches the terminal surface for the ActionQ session monitor.
//!
//! Usage:
//!   actionq-tui [OPTIONS]
//!
//! Options:
//!   --url <URL>           Session server (default: ws://localhost:8765)
//!   --config <PATH>       Configuration file
//!   --assets <DIR>        Exercise asset root
//!   --no-audio            Disable voice guidance
//!   --log-file <PATH>     Log destination (the terminal is taken by the UI)

use std::fs::File;
use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use actionq_core::config::{self, ConfigOverrides};
use actionq_tui::{App, MonitorClient};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "actionq-tui", version, about = "Terminal surface for ActionQ sessions")]
struct Args {
    /// Session server URL
    #[arg(long)]
    url: Option<String>,

    /// Configuration file (default: ~/.config/actionq/monitor.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exercise asset root
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Disable voice guidance
    #[arg(long)]
    no_audio: bool,

    /// Log file
    #[arg(long, env = "ACTIONQ_TUI_LOG")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up logging; stdout belongs to the UI
    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("actionq-tui.log"));
    let log_file = File::create(&log_path)
        .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("actionq_tui=info".parse()?)
                .add_directive("actionq_core=info".parse()?),
        )
        .init();

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: actionq-tui requires a terminal (TTY)");
        eprintln!();
        eprintln!("For non-interactive use run actionq-headless instead.");
        std::process::exit(1);
    }

    let mut config = config::load_config_from_path(args.config.or_else(config::default_config_path))
        .context("Failed to load configuration")?;
    let mut overrides = ConfigOverrides::new();
    if let Some(url) = args.url {
        overrides = overrides.with_url(url);
    }
    if let Some(root) = args.assets {
        overrides = overrides.with_asset_root(root);
    }
    if args.no_audio {
        overrides = overrides.with_audio_enabled(false);
    }
    overrides.apply(&mut config);
    config.validate()?;

    tracing::info!(url = %config.url, source = %config.source(), "Starting TUI");

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal before printing panic
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = run_app(&mut terminal, &config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Propagate any errors
    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &config::MonitorConfig,
) -> anyhow::Result<()> {
    let monitor = MonitorClient::connect(config)?;
    let mut app = App::new(monitor, config.url.clone());
    app.run(terminal).await
}
