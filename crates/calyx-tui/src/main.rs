mod app;
mod handler;
mod logging;
mod markdown;
mod theme;
mod tui;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use calyx_core::Config;
use clap::Parser;
use tracing::{info, warn};

use app::App;
use tui::{EventHandler, TICK_RATE};

#[derive(Parser, Debug)]
#[command(name = "calyx", version)]
#[command(about = "Terminal client for the Calyx AI nutrition assistant")]
struct Args {
    /// Read and write settings at this path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Backend base URL (overrides the config file and CALYX_API_URL)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,
    /// Do not start the backend process
    #[arg(long)]
    no_backend: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env();
    if let Some(url) = &args.api_url {
        config.api_url = url.clone();
    }
    if args.no_backend {
        config.autostart_backend = false;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let log_dir = args
        .config
        .as_ref()
        .and_then(|path| path.parent().map(PathBuf::from))
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("calyx")));
    let log_path = logging::init(log_dir.as_deref());
    info!(api_url = %config.api_url, log = ?log_path, "starting calyx");

    // Setup terminal
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(config, args.config.clone());
    app.start();

    let result = run(&mut terminal, &mut app).await;

    app.shutdown().await;
    tui::restore()?;

    if let Err(err) = &result {
        warn!("exiting with error: {:#}", err);
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;

        app.poll_tasks().await;
        app.refresh_backend_state();
    }

    info!("quit requested");
    Ok(())
}
