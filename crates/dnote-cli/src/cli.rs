use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dnote")]
#[command(about = "A simple command line notebook")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a note to a book, creating the book if needed
    #[command(alias = "n")]
    Add {
        /// Book label
        book: String,
        /// Note content; opens $EDITOR when omitted
        content: Vec<String>,
    },
    /// List books, or the notes of one book
    #[command(alias = "ls")]
    View {
        /// Book label; lists all books when omitted
        book: Option<String>,
    },
    /// Edit an existing note
    #[command(alias = "e")]
    Edit {
        /// Note ID or unique ID prefix
        note_id: String,
        /// Replacement content; opens $EDITOR when omitted
        content: Vec<String>,
    },
    /// Remove a note, or a whole book with --book
    #[command(alias = "rm")]
    Remove {
        /// Note ID or unique ID prefix
        note_id: Option<String>,
        /// Remove this book and all of its notes
        #[arg(long, value_name = "LABEL", conflicts_with = "note_id")]
        book: Option<String>,
    },
    /// Search notes by content
    #[command(alias = "f")]
    Find {
        /// Search query
        query: String,
        /// Number of matches to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Sync data with the server
    #[command(alias = "s")]
    Sync {
        /// Perform a full sync instead of incrementally syncing only the changed data
        #[arg(short, long)]
        full: bool,
    },
}
