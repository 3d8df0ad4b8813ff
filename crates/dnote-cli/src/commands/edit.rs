use std::path::Path;

use dnote_core::db::notes;
use dnote_core::Note;

use crate::commands::common::{
    capture_editor_input, normalize_content, open_database, resolve_note, short_id,
};
use crate::error::CliError;

pub fn run_edit(note_query: &str, content_parts: &[String], db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let note = resolve_note(&db, note_query)?;

    let content = match normalize_content(&content_parts.join(" ")) {
        Some(content) => content,
        None => capture_editor_input(&note.body)?.ok_or(CliError::EmptyContent)?,
    };

    if content == note.body {
        println!("No changes made to {}", short_id(&note.uuid));
        return Ok(());
    }

    notes::update(
        db.connection(),
        &Note {
            body: content,
            edited_on: chrono::Utc::now().timestamp(),
            dirty: true,
            ..note.clone()
        },
    )?;

    println!("Edited {}", short_id(&note.uuid));
    Ok(())
}
