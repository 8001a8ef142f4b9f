use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use tokio::sync::mpsc::UnboundedSender;
use tracing_subscriber::EnvFilter;

mod app;
mod client;
mod config;
mod handler;
mod state;
mod tui;
mod ui;

use app::App;
use client::ChatClient;
use config::{Config, SERVER_URL_ENV};
use tui::{AppEvent, EventHandler, Tui};

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(about = "Terminal chat client for a prompt/reply chatbot backend")]
#[command(version)]
struct Cli {
    /// Chat backend base URL (overrides CHATBOT_SERVER_URL and the config file)
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Where to write logs (defaults to chatbot.log in the temp directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write the session transcript as JSON lines to this file on exit
    #[arg(long)]
    transcript: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single prompt and print the reply
    Ask {
        /// Prompt text
        prompt: String,
    },
    /// Check that the backend is up
    Health,
    /// Remember a backend URL in the config file
    SetServer {
        /// Base URL, e.g. http://localhost:8000
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("{}: {}", "Ignoring unreadable config".yellow(), e);
        Config::new()
    });

    init_logging(&config.resolve_log_file(cli.log_file.clone()))?;

    let server_url =
        config.resolve_server_url(cli.server.as_deref(), std::env::var(SERVER_URL_ENV).ok());
    tracing::info!(%server_url, "starting");

    match cli.command {
        None => run_chat(&server_url, cli.transcript.as_deref()).await?,
        Some(Commands::Ask { prompt }) => ask(&server_url, &prompt).await?,
        Some(Commands::Health) => health(&server_url).await?,
        Some(Commands::SetServer { url }) => {
            let path = Config::save_server_url(&url)?;
            println!("Saved server {} to {}", url.bold(), path.display().to_string().dimmed());
        }
    }

    Ok(())
}

/// Logs go to a file so they never fight the TUI for the terminal
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatbot=info"));

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_env_filter(filter)
        .with_ansi(false)
        .init();

    Ok(())
}

async fn run_chat(server_url: &str, transcript: Option<&Path>) -> Result<()> {
    let mut app = App::new(ChatClient::new(server_url));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let tx = events.sender();

    let result = run_loop(&mut terminal, &mut app, &mut events, &tx).await;
    tui::restore()?;

    if app.pending > 0 {
        tracing::info!(pending = app.pending, "quitting with requests still in flight");
    }

    if let Some(path) = transcript {
        std::fs::write(path, state::to_json_lines(&app.messages)?)
            .with_context(|| format!("Could not write transcript to {}", path.display()))?;
        tracing::info!(path = %path.display(), messages = app.messages.len(), "transcript written");
    }

    result
}

async fn run_loop(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
    tx: &UnboundedSender<AppEvent>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event, tx),
            None => break,
        }
    }
    Ok(())
}

async fn ask(server_url: &str, prompt: &str) -> Result<()> {
    if prompt.is_empty() {
        bail!("Prompt is empty");
    }

    let client = ChatClient::new(server_url);
    println!("{} {}", "You:".bold().cyan(), prompt);

    match client.send(prompt).await {
        Ok(reply) => {
            println!("{} {}", "Bot:".bold().yellow(), reply);
        }
        Err(e) => {
            tracing::warn!(error = %e, "ask failed");
            println!("{}: {}", "Error querying chatbot".red(), e);
            println!("Make sure the backend is running at {}", server_url.bold());
            return Err(e).context("No reply from chatbot");
        }
    }

    Ok(())
}

async fn health(server_url: &str) -> Result<()> {
    let client = ChatClient::new(server_url);

    match client.health().await {
        Ok(status) => {
            println!("{} {}", server_url.bold(), status.green());
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            println!("{}: {}", "Backend unreachable".red(), e);
            return Err(e).with_context(|| format!("Backend unreachable at {}", server_url));
        }
    }

    Ok(())
}
