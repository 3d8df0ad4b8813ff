use std::collections::HashMap;
use std::path::Path;

use dnote_core::db::{books, notes};

use crate::commands::common::{note_preview, open_database, short_id};
use crate::error::CliError;

pub fn run_find(query: &str, limit: usize, db_path: &Path) -> Result<(), CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyContent);
    }

    let db = open_database(db_path)?;
    let matches = notes::search(db.connection(), trimmed, limit)?;

    if matches.is_empty() {
        println!("No results for '{trimmed}'.");
        return Ok(());
    }

    let mut labels: HashMap<String, String> = HashMap::new();
    for note in &matches {
        if !labels.contains_key(&note.book_uuid) {
            let label = books::get(db.connection(), &note.book_uuid)?
                .map_or_else(|| "?".to_string(), |book| book.label);
            labels.insert(note.book_uuid.clone(), label);
        }
    }

    for note in &matches {
        println!(
            "{:<8}  ({})  {}",
            short_id(&note.uuid),
            labels[&note.book_uuid],
            note_preview(note, 60)
        );
    }
    Ok(())
}
