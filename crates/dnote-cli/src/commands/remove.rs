use std::path::Path;

use dnote_core::db::{books, notes};
use dnote_core::{Book, Note};

use crate::commands::common::{open_database, resolve_note, short_id};
use crate::error::CliError;

pub fn run_remove(
    note_query: Option<&str>,
    book_label: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    match (note_query, book_label) {
        (Some(query), None) => remove_note(query, db_path),
        (None, Some(label)) => remove_book(label, db_path),
        _ => Err(CliError::MissingRemoveTarget),
    }
}

/// Tombstone one note; push decides whether the server ever hears of it.
fn remove_note(note_query: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let note = resolve_note(&db, note_query)?;

    notes::update(
        db.connection(),
        &Note {
            deleted: true,
            dirty: true,
            ..note.clone()
        },
    )?;

    println!("Removed {}", short_id(&note.uuid));
    Ok(())
}

/// Tombstone a book together with all of its notes.
fn remove_book(label: &str, db_path: &Path) -> Result<(), CliError> {
    let mut db = open_database(db_path)?;
    let tx = db
        .connection_mut()
        .transaction()
        .map_err(dnote_core::Error::Store)?;

    let book = books::get_live_by_label(&tx, label)?
        .ok_or_else(|| CliError::BookNotFound(label.to_string()))?;

    let in_book = notes::list_by_book(&tx, &book.uuid)?;
    let count = in_book.len();
    for note in in_book {
        notes::update(
            &tx,
            &Note {
                deleted: true,
                dirty: true,
                ..note
            },
        )?;
    }

    books::update(
        &tx,
        &Book {
            deleted: true,
            dirty: true,
            ..book.clone()
        },
    )?;

    tx.commit().map_err(dnote_core::Error::Store)?;

    println!("Removed {} and {count} note(s)", book.label);
    Ok(())
}
