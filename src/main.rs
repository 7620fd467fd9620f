mod app;
mod braille;
mod config;
mod display;
mod grid;
mod input;
mod session;

use anyhow::Result;
use clap::Parser;
use std::{fs::OpenOptions, sync::Mutex};
use tracing_subscriber::EnvFilter;

// stdout is the board, so logs only go somewhere when this names a file.
const LOG_FILE_ENV: &str = "BRAILLE_LIFE_LOG";

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match std::env::var_os(LOG_FILE_ENV) {
        Some(path) if !path.is_empty() => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        _ => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .try_init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = config::Config::parse();
    init_logging()?;
    app::run(config)
}
