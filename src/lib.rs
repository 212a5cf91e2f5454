pub mod collection; // Appointment book: ordered CRUD with write-through
pub mod commands; // JSON command interface
pub mod config;
pub mod db;
pub mod form; // Editor field codec
pub mod ids;
pub mod models;
pub mod scheduler; // Composition root + editor session
pub mod store; // Durable slot storage

use std::io::{self, BufRead, Write};

use tracing_subscriber::EnvFilter;

use crate::scheduler::Scheduler;

/// Serve the command interface over stdin/stdout, one JSON request per line.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries responses only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let mut scheduler = Scheduler::open_database(&config::database_path())?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = commands::dispatch(&line, &mut scheduler);
        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
