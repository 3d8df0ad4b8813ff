//! The local migration sequence.
//!
//! Pure schema/data changes, ordered oldest first. Entries up through the
//! `actions` drop exist to carry forward stores from the era when edits
//! were queued as action records; they no-op on fresh stores.

use rusqlite::{params, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};

use crate::db::books;
use crate::error::Result;
use crate::models::RESERVED_BOOK_LABELS;

use super::{Env, Migration};

pub(super) const SEQUENCE: &[Migration] = &[
    Migration {
        name: "upgrade-edit-note-from-v1-to-v3",
        run: upgrade_edit_note_v1,
    },
    Migration {
        name: "upgrade-edit-note-from-v2-to-v3",
        run: upgrade_edit_note_v2,
    },
    Migration {
        name: "upgrade-remove-note-from-v1-to-v2",
        run: upgrade_remove_note_v1,
    },
    Migration {
        name: "add-dirty-usn-deleted-to-notes-and-books",
        run: add_sync_columns,
    },
    Migration {
        name: "mark-action-targets-dirty",
        run: mark_action_targets_dirty,
    },
    Migration {
        name: "drop-actions",
        run: drop_actions,
    },
    Migration {
        name: "resolve-conflicts-with-reserved-book-names",
        run: resolve_reserved_labels,
    },
    Migration {
        name: "drop-note-id-and-rename-content-to-body",
        run: rebuild_notes_table,
    },
    Migration {
        name: "create-fts-index",
        run: create_fts_index,
    },
];

// Queued-action payloads, as serialized by old releases.

#[derive(Deserialize)]
struct EditNoteDataV1 {
    note_uuid: String,
    content: String,
}

#[derive(Deserialize)]
struct EditNoteDataV2 {
    note_uuid: String,
    to_book: Option<String>,
    content: Option<String>,
    public: Option<bool>,
}

#[derive(Serialize, Deserialize)]
struct EditNoteDataV3 {
    note_uuid: String,
    book_name: Option<String>,
    content: Option<String>,
    public: Option<bool>,
}

#[derive(Deserialize)]
struct RemoveNoteDataV1 {
    note_uuid: String,
}

#[derive(Serialize)]
struct RemoveNoteDataV2 {
    note_uuid: String,
}

#[derive(Deserialize)]
struct AddNoteDataV2 {
    note_uuid: String,
}

#[derive(Deserialize)]
struct AddBookDataV1 {
    book_name: String,
}

fn load_actions(tx: &Transaction<'_>, kind: &str, schema: i64) -> Result<Vec<(String, String)>> {
    let mut stmt = tx.prepare("SELECT uuid, data FROM actions WHERE type = ? AND schema = ?")?;
    let rows = stmt
        .query_map(params![kind, schema], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn upgrade_edit_note_v1(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    for (uuid, data) in load_actions(tx, "edit_note", 1)? {
        let old: EditNoteDataV1 = serde_json::from_str(&data)?;
        // v1 edits could not move a note between books or publish it
        let new = EditNoteDataV3 {
            note_uuid: old.note_uuid,
            book_name: None,
            content: Some(old.content),
            public: Some(false),
        };
        tx.execute(
            "UPDATE actions SET data = ?, schema = 3 WHERE uuid = ?",
            params![serde_json::to_string(&new)?, uuid],
        )?;
    }
    Ok(())
}

fn upgrade_edit_note_v2(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    for (uuid, data) in load_actions(tx, "edit_note", 2)? {
        let old: EditNoteDataV2 = serde_json::from_str(&data)?;
        let new = EditNoteDataV3 {
            note_uuid: old.note_uuid,
            book_name: old.to_book,
            content: old.content,
            public: old.public,
        };
        tx.execute(
            "UPDATE actions SET data = ?, schema = 3 WHERE uuid = ?",
            params![serde_json::to_string(&new)?, uuid],
        )?;
    }
    Ok(())
}

fn upgrade_remove_note_v1(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    for (uuid, data) in load_actions(tx, "remove_note", 1)? {
        let old: RemoveNoteDataV1 = serde_json::from_str(&data)?;
        let new = RemoveNoteDataV2 {
            note_uuid: old.note_uuid,
        };
        tx.execute(
            "UPDATE actions SET data = ?, schema = 2 WHERE uuid = ?",
            params![serde_json::to_string(&new)?, uuid],
        )?;
    }
    Ok(())
}

fn add_sync_columns(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        "
        ALTER TABLE books ADD COLUMN dirty bool DEFAULT false;
        ALTER TABLE books ADD COLUMN usn int DEFAULT 0 NOT NULL;
        ALTER TABLE books ADD COLUMN deleted bool DEFAULT false;
        ALTER TABLE notes ADD COLUMN dirty bool DEFAULT false;
        ALTER TABLE notes ADD COLUMN usn int DEFAULT 0 NOT NULL;
        ALTER TABLE notes ADD COLUMN deleted bool DEFAULT false;
        ",
    )?;
    Ok(())
}

fn mark_action_targets_dirty(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    let rows = {
        let mut stmt = tx.prepare("SELECT data, type FROM actions")?;
        let result = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        result
    };

    // removals cannot be derived retrospectively because books did not use
    // to carry uuids; an unsynced removal resurfaces but loses no data
    for (data, kind) in rows {
        match kind.as_str() {
            "add_note" => {
                let payload: AddNoteDataV2 = serde_json::from_str(&data)?;
                tx.execute(
                    "UPDATE notes SET dirty = 1 WHERE uuid = ?",
                    params![payload.note_uuid],
                )?;
            }
            "edit_note" => {
                let payload: EditNoteDataV3 = serde_json::from_str(&data)?;
                tx.execute(
                    "UPDATE notes SET dirty = 1 WHERE uuid = ?",
                    params![payload.note_uuid],
                )?;
            }
            "add_book" => {
                let payload: AddBookDataV1 = serde_json::from_str(&data)?;
                tx.execute(
                    "UPDATE books SET dirty = 1 WHERE label = ?",
                    params![payload.book_name],
                )?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn drop_actions(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    tx.execute("DROP TABLE actions", [])?;
    Ok(())
}

fn resolve_reserved_labels(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    for reserved in RESERVED_BOOK_LABELS {
        let uuid: Option<String> = tx
            .query_row(
                "SELECT uuid FROM books WHERE label = ?",
                params![reserved],
                |row| row.get(0),
            )
            .optional()?;
        let Some(uuid) = uuid else {
            continue;
        };

        let replacement = books::resolve_label(tx, reserved)?;
        tx.execute(
            "UPDATE books SET label = ?, dirty = 1 WHERE uuid = ?",
            params![replacement, uuid],
        )?;
    }
    Ok(())
}

fn rebuild_notes_table(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        "
        CREATE TABLE notes_tmp
        (
            uuid text NOT NULL,
            book_uuid text NOT NULL,
            body text NOT NULL,
            added_on integer NOT NULL,
            edited_on integer DEFAULT 0,
            public bool DEFAULT false,
            dirty bool DEFAULT false,
            usn int DEFAULT 0 NOT NULL,
            deleted bool DEFAULT false
        );
        INSERT INTO notes_tmp
            SELECT uuid, book_uuid, content, added_on, edited_on, public, dirty, usn, deleted FROM notes;
        DROP TABLE notes;
        ALTER TABLE notes_tmp RENAME TO notes;
        ",
    )?;
    Ok(())
}

fn create_fts_index(_env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    tx.execute_batch(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS note_fts
            USING fts5(content=notes, body, tokenize="porter unicode61 categories 'L* N* Co Ps Pe'");

        CREATE TRIGGER notes_after_insert AFTER INSERT ON notes BEGIN
            INSERT INTO note_fts(rowid, body) VALUES (new.rowid, new.body);
        END;
        CREATE TRIGGER notes_after_delete AFTER DELETE ON notes BEGIN
            INSERT INTO note_fts(note_fts, rowid, body) VALUES ('delete', old.rowid, old.body);
        END;
        CREATE TRIGGER notes_after_update AFTER UPDATE ON notes BEGIN
            INSERT INTO note_fts(note_fts, rowid, body) VALUES ('delete', old.rowid, old.body);
            INSERT INTO note_fts(rowid, body) VALUES (new.rowid, new.body);
        END;

        INSERT INTO note_fts (rowid, body) SELECT rowid, body FROM notes;
        "#,
    )?;
    Ok(())
}
