/// Aria Headless - terminal-driven playback engine
mod commands;
mod config;
mod simulated;

use anyhow::{Context, Result};
use aria_playback::{
    persistence::SessionStore, JsonFileStore, PlaybackEngine, PlayerState, Track,
};
use clap::{Parser, Subcommand};
use crossbeam_channel::{select, tick, unbounded};
use std::{
    fs,
    io::{self, BufRead},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Command, Flow};
use crate::config::AppConfig;
use crate::simulated::SimulatedPrimitive;

#[derive(Parser)]
#[command(name = "aria-headless")]
#[command(about = "Aria Player playback engine driven from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ARIA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted session (overrides the config file)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the player, reading commands from stdin (default)
    Run {
        /// JSON file with an array of tracks to load on start
        #[arg(short, long)]
        playlist: Option<PathBuf>,
    },
    /// Print the persisted session
    Inspect,
    /// Delete the persisted session
    Reset,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aria_playback=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run { playlist: None }) {
        Commands::Run { playlist } => run(&config, playlist.as_deref()),
        Commands::Inspect => inspect(&config),
        Commands::Reset => reset(&config),
    }
}

fn session_store(config: &AppConfig) -> SessionStore {
    SessionStore::new(
        Box::new(JsonFileStore::new(&config.state_dir)),
        config.engine.storage_key.clone(),
    )
}

fn inspect(config: &AppConfig) -> Result<()> {
    match session_store(config).try_restore()? {
        Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
        None => println!("no saved session in {}", config.state_dir.display()),
    }
    Ok(())
}

fn reset(config: &AppConfig) -> Result<()> {
    session_store(config).forget();
    println!("saved session removed");
    Ok(())
}

fn read_playlist(path: &Path) -> Result<Vec<Track>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read playlist {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid playlist {}", path.display()))
}

fn run(config: &AppConfig, playlist: Option<&Path>) -> Result<()> {
    info!("Starting Aria headless player");
    info!(state_dir = %config.state_dir.display(), "session storage");

    let primitive = SimulatedPrimitive::new(config.simulator.clone());
    let store = JsonFileStore::new(&config.state_dir);
    let mut engine = PlaybackEngine::new(primitive, Box::new(store), config.engine.clone());

    // Print a line whenever the track, play state or error changes
    let mut last_seen: Option<(Option<usize>, bool, bool, Option<String>)> = None;
    let _subscription = engine.subscribe(move |state: &PlayerState| {
        let key = (
            state.current_index,
            state.is_playing,
            state.is_loading,
            state.last_error.clone(),
        );
        if last_seen.as_ref() != Some(&key) {
            println!("{}", commands::summarize(state));
            if let Some(error) = &state.last_error {
                println!("error: {}", error);
            }
            last_seen = Some(key);
        }
    });

    engine.init();

    if let Some(path) = playlist {
        let tracks = read_playlist(path)?;
        info!(tracks = tracks.len(), "loading playlist from {}", path.display());
        engine.load_playlist(tracks);
    }

    let (line_tx, line_rx) = unbounded::<String>();
    thread::Builder::new()
        .name("aria-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read stdin");
                        break;
                    }
                }
            }
        })
        .context("failed to start stdin reader")?;

    let ticker = tick(Duration::from_millis(config.tick_interval_ms));
    println!("type 'help' for commands");

    loop {
        select! {
            recv(line_rx) -> line => {
                // stdin closed
                let Ok(line) = line else { break };
                if handle_line(&mut engine, &line) == Flow::Quit {
                    break;
                }
            }
            recv(ticker) -> _ => {
                engine.process_events();
                engine.tick();
            }
        }
    }

    info!("Shutting down");
    drop(engine.dispose());
    Ok(())
}

fn handle_line(engine: &mut PlaybackEngine<SimulatedPrimitive>, line: &str) -> Flow {
    if line.trim().is_empty() {
        return Flow::Continue;
    }

    match line.parse::<Command>() {
        Ok(command) => match commands::run(engine, command) {
            Ok(flow) => flow,
            Err(e) => {
                println!("error: {}", e);
                Flow::Continue
            }
        },
        Err(e) => {
            println!("{}", e);
            Flow::Continue
        }
    }
}
