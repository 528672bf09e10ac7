use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use galleon::config::{self, Config};
use galleon::engine::{GalleryEngine, RenderOutcome};
use galleon::fetch::HttpFetcher;
use galleon::layout::Viewport;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GALLEON_BUILD_GIT_HASH"),
    " ",
    env!("GALLEON_BUILD_PROFILE"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "galleon",
    version = VERSION,
    about = "Windowed browser for segmented photo galleries"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Gallery origin (e.g. https://photos.example.com)
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Pin the cache-bust token instead of deriving the hourly one
    #[arg(long, global = true)]
    cache_bust: Option<String>,

    /// Log output file path (enables logging in browse mode)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Browse the gallery interactively (default)
    Browse,

    /// Run one render for a viewport and print the grid as JSON
    Layout {
        /// Viewport width in px
        #[arg(long, default_value_t = 1280)]
        width: u32,

        /// Scroll offset in px
        #[arg(long, default_value_t = 0)]
        scroll_top: u32,
    },

    /// Load the window holding an item and print its descriptor as JSON
    Item {
        /// Global index (0 = newest item)
        index: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let browsing = matches!(cli.command, None | Some(Command::Browse));
    if let Some(log_path) = &cli.log {
        let file = match std::fs::File::create(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: failed to open log file {}: {e}", log_path.display());
                std::process::exit(1);
            }
        };
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else if !browsing {
        env_logger::init();
    }
    // browse mode + no --log → logger not initialized (stdout is the UI)

    let mut cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    cfg.merge_cli(cli.origin, cli.cache_bust);
    let config = cfg.resolve();

    let result = match cli.command {
        None | Some(Command::Browse) => galleon::viewer::run(&config),
        Some(Command::Layout { width, scroll_top }) => {
            cmd_layout(&config, Viewport { width, scroll_top })
        }
        Some(Command::Item { index }) => cmd_item(&config, index),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn open_engine(config: &Config) -> Result<GalleryEngine> {
    let fetcher = Arc::new(HttpFetcher::new(config.http_timeout));
    let mut engine = GalleryEngine::new(config.to_engine_config(), fetcher);
    engine
        .init()
        .with_context(|| format!("failed to load segment directory from {}", config.origin))?;
    info!(
        "engine: {} segments, {} items, cache_bust={}",
        engine.directory().map_or(0, |d| d.len()),
        engine.total(),
        engine.cache_bust()
    );
    Ok(engine)
}

fn cmd_layout(config: &Config, viewport: Viewport) -> Result<()> {
    let start = Instant::now();
    let mut engine = open_engine(config)?;

    match engine.render(viewport)? {
        RenderOutcome::Rebuilt(frame) => {
            println!("{}", serde_json::to_string_pretty(&frame)?);
        }
        RenderOutcome::Skipped => {
            eprintln!("collection is empty, nothing to lay out");
        }
    }

    info!(
        "cmd_layout: completed in {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

fn cmd_item(config: &Config, index: usize) -> Result<()> {
    let mut engine = open_engine(config)?;
    if index >= engine.total() {
        anyhow::bail!(
            "index {index} out of range (collection has {} items)",
            engine.total()
        );
    }

    let window = engine
        .load_index(index)?
        .context("collection is empty")?;
    let item = engine
        .item(index)
        .with_context(|| format!("item {index} missing from manifest"))?;
    eprintln!(
        "window cursor={} start={} ({} items)",
        window.cursor,
        window.start_offset,
        window.items.len()
    );
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}
