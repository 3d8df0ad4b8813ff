use std::path::Path;

use dnote_core::db::{books, notes};

use crate::commands::common::{format_note_lines, open_database};
use crate::error::CliError;

pub fn run_view(book_label: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;

    let Some(label) = book_label else {
        let all = books::list_live(db.connection())?;
        if all.is_empty() {
            println!("No books yet. Add a note with `dnote add <book> <content>`.");
            return Ok(());
        }
        for book in all {
            let count = notes::count_live_in_book(db.connection(), &book.uuid)?;
            println!("{} ({count})", book.label);
        }
        return Ok(());
    };

    let book = books::get_live_by_label(db.connection(), label)?
        .ok_or_else(|| CliError::BookNotFound(label.to_string()))?;

    let in_book = notes::list_by_book(db.connection(), &book.uuid)?;
    if in_book.is_empty() {
        println!("No notes in {}.", book.label);
        return Ok(());
    }
    for line in format_note_lines(&in_book) {
        println!("{line}");
    }
    Ok(())
}
