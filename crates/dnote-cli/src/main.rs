//! Dnote CLI - a simple command line notebook
//!
//! Notes live in a local SQLite store and sync against a remote server
//! with end-to-end encrypted payloads.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dnote=info".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = commands::common::resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add { book, content } => commands::add::run_add(&book, &content, &db_path)?,
        Commands::View { book } => commands::view::run_view(book.as_deref(), &db_path)?,
        Commands::Edit { note_id, content } => {
            commands::edit::run_edit(&note_id, &content, &db_path)?;
        }
        Commands::Remove { note_id, book } => {
            commands::remove::run_remove(note_id.as_deref(), book.as_deref(), &db_path)?;
        }
        Commands::Find { query, limit } => commands::find::run_find(&query, limit, &db_path)?,
        Commands::Sync { full } => commands::sync::run_sync(full, &db_path)?,
    }

    Ok(())
}
