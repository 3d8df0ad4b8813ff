use std::path::Path;

use dnote_core::db::{books, notes};
use dnote_core::models::{is_reserved_label, Book, Note};

use crate::commands::common::{open_database, resolve_note_content, short_id};
use crate::error::CliError;

pub fn run_add(book_label: &str, content_parts: &[String], db_path: &Path) -> Result<(), CliError> {
    let label = book_label.trim();
    if label.is_empty() {
        return Err(CliError::EmptyBookLabel);
    }
    if is_reserved_label(label) {
        return Err(CliError::ReservedBookLabel(label.to_string()));
    }

    let content = resolve_note_content(content_parts)?;

    let mut db = open_database(db_path)?;
    let tx = db.connection_mut().transaction().map_err(dnote_core::Error::Store)?;

    let book = match books::get_live_by_label(&tx, label)? {
        Some(book) => book,
        None => {
            let book = Book::local(label);
            books::insert(&tx, &book)?;
            book
        }
    };

    let note = Note::local(&book.uuid, content);
    notes::insert(&tx, &note)?;

    tx.commit().map_err(dnote_core::Error::Store)?;

    println!("Added {} to {}", short_id(&note.uuid), book.label);
    Ok(())
}
