mod controller;
mod document;
mod engine;
mod settings;
mod timer;
mod ui;

use crate::controller::Controller;
use crate::document::Document;
use crate::settings::{Algorithm, Color, JsonFileStore, MemoryStore, Settings, SettingsStore};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::sync::mpsc;
use tracing_subscriber::filter::EnvFilter;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// HTML file to load
    #[arg(long, value_name = "FILE")]
    input: PathBuf,
    /// Write the filtered document and exit (default is the interactive panel)
    #[arg(long)]
    pipe: bool,
    /// Output path for --pipe (default is stdout)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Settings file; omit to keep settings in memory for this run
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,
    /// Override the coloring algorithm (char or word)
    #[arg(long)]
    algorithm: Option<Algorithm>,
    /// Override the first alternating color (#RRGGBB)
    #[arg(long = "color-a", value_name = "COLOR")]
    color_a: Option<Color>,
    /// Override the second alternating color (#RRGGBB)
    #[arg(long = "color-b", value_name = "COLOR")]
    color_b: Option<Color>,
    /// Override the page background (#FFFFFF leaves the page alone)
    #[arg(long, value_name = "COLOR")]
    background: Option<Color>,
    /// Override the text scale percentage (50-200)
    #[arg(long = "text-scale", value_name = "PERCENT")]
    text_scale: Option<u16>,
    /// Do not recolor after outside document changes
    #[arg(long = "no-watch")]
    no_watch: bool,
    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug_log: bool,
}

/// CLI overrides land on the loaded settings but are not written back on
/// their own; they persist only once the user changes something.
fn apply_overrides(settings: &mut Settings, cfg: &Config) {
    if let Some(algorithm) = cfg.algorithm {
        settings.algorithm = algorithm;
    }
    if let Some(color) = &cfg.color_a {
        settings.color_a = color.clone();
    }
    if let Some(color) = &cfg.color_b {
        settings.color_b = color.clone();
    }
    if let Some(color) = &cfg.background {
        settings.background = color.clone();
    }
    if let Some(scale) = cfg.text_scale {
        settings.text_scale = Settings::clamp_scale(scale);
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cfg = Config::parse();
    init_logging(cfg.debug_log);

    let html = std::fs::read_to_string(&cfg.input)?;
    let document = Rc::new(Document::parse(&html));

    let store: Box<dyn SettingsStore> = match &cfg.settings {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::default()),
    };

    // The document tree is single-threaded; everything that touches it runs
    // on this LocalSet.
    let local = tokio::task::LocalSet::new();
    let result = local
        .run_until(async {
            let mut settings = settings::load_settings(store.as_ref());
            apply_overrides(&mut settings, &cfg);

            if cfg.pipe {
                return ui::pipe::run(document.clone(), &settings, cfg.output.as_deref());
            }

            let engine = engine::FilterEngine::new(document.clone(), !cfg.no_watch);
            let (engine_tx, engine_rx) = mpsc::channel(8);
            let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);
            tokio::task::spawn_local(engine::service::run(engine, engine_rx, shutdown_rx));

            let mut controller = Controller::new(settings, store, engine_tx);
            controller.resume().await;
            ui::panel::run(document.clone(), controller).await
        })
        .await;

    // Print error if any, for better diagnostics
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e);
    }
    Ok(())
}
