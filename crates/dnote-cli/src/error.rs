use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] dnote_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Book label cannot be empty")]
    EmptyBookLabel,
    #[error("{0:?} is a reserved book label")]
    ReservedBookLabel(String),
    #[error("Book not found: {0}")]
    BookNotFound(String),
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Specify a note id or --book LABEL")]
    MissingRemoveTarget,
}
