//! Typed store operations for notes

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::Note;

fn from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        uuid: row.get(0)?,
        book_uuid: row.get(1)?,
        body: row.get(2)?,
        added_on: row.get(3)?,
        edited_on: row.get(4)?,
        public: row.get(5)?,
        usn: row.get(6)?,
        dirty: row.get(7)?,
        deleted: row.get(8)?,
    })
}

const COLUMNS: &str = "uuid, book_uuid, body, added_on, edited_on, public, usn, dirty, deleted";

pub fn get(conn: &Connection, uuid: &str) -> Result<Option<Note>> {
    let note = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM notes WHERE uuid = ?"),
            params![uuid],
            from_row,
        )
        .optional()?;
    Ok(note)
}

/// Live notes of one book, oldest first.
pub fn list_by_book(conn: &Connection, book_uuid: &str) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM notes WHERE book_uuid = ? AND deleted = 0 ORDER BY added_on"
    ))?;
    let notes = stmt
        .query_map(params![book_uuid], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

/// Every note row, live or tombstoned. Used by the full-sync cleanup scan.
pub fn list_all(conn: &Connection) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM notes"))?;
    let notes = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

/// Snapshot of the notes that carry unsynced changes.
pub fn list_dirty(conn: &Connection) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM notes WHERE dirty = 1"))?;
    let notes = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

pub fn count_dirty(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT count(*) FROM notes WHERE dirty = 1", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

/// Whether any note of the given book carries unsynced changes.
pub fn any_dirty_in_book(conn: &Connection, book_uuid: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM notes WHERE book_uuid = ? AND dirty = 1",
        params![book_uuid],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn count_live_in_book(conn: &Connection, book_uuid: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT count(*) FROM notes WHERE book_uuid = ? AND deleted = 0",
        params![book_uuid],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn insert(conn: &Connection, note: &Note) -> Result<()> {
    conn.execute(
        "INSERT INTO notes (uuid, book_uuid, body, added_on, edited_on, public, usn, dirty, deleted)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            note.uuid,
            note.book_uuid,
            note.body,
            note.added_on,
            note.edited_on,
            note.public,
            note.usn,
            note.dirty,
            note.deleted
        ],
    )?;
    Ok(())
}

/// Overwrite every mutable field of the row identified by `note.uuid`.
/// `added_on` never changes after insertion.
pub fn update(conn: &Connection, note: &Note) -> Result<()> {
    conn.execute(
        "UPDATE notes SET book_uuid = ?, body = ?, edited_on = ?, public = ?, usn = ?, dirty = ?, deleted = ?
         WHERE uuid = ?",
        params![
            note.book_uuid,
            note.body,
            note.edited_on,
            note.public,
            note.usn,
            note.dirty,
            note.deleted,
            note.uuid
        ],
    )?;
    Ok(())
}

/// Replace a note's uuid with the server-assigned identity.
pub fn update_uuid(conn: &Connection, old_uuid: &str, new_uuid: &str) -> Result<()> {
    conn.execute(
        "UPDATE notes SET uuid = ? WHERE uuid = ?",
        params![new_uuid, old_uuid],
    )?;
    Ok(())
}

/// Repoint notes from one book uuid to another, e.g. after the owning
/// book's first upload replaced its local uuid.
pub fn rewrite_book_uuid(conn: &Connection, old_book_uuid: &str, new_book_uuid: &str) -> Result<()> {
    conn.execute(
        "UPDATE notes SET book_uuid = ? WHERE book_uuid = ?",
        params![new_book_uuid, old_book_uuid],
    )?;
    Ok(())
}

/// Hard-delete the row. Distinct from the `deleted` tombstone.
pub fn expunge(conn: &Connection, uuid: &str) -> Result<()> {
    conn.execute("DELETE FROM notes WHERE uuid = ?", params![uuid])?;
    Ok(())
}

/// Hard-delete every note of the given book.
pub fn expunge_by_book(conn: &Connection, book_uuid: &str) -> Result<()> {
    conn.execute("DELETE FROM notes WHERE book_uuid = ?", params![book_uuid])?;
    Ok(())
}

/// Full-text search over live note bodies, best match first.
pub fn search(conn: &Connection, query: &str, limit: usize) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM notes n
         JOIN note_fts fts ON n.rowid = fts.rowid
         WHERE note_fts MATCH ? AND n.deleted = 0
         ORDER BY rank
         LIMIT ?",
        COLUMNS
            .split(", ")
            .map(|column| format!("n.{column}"))
            .collect::<Vec<_>>()
            .join(", ")
    ))?;
    let notes = stmt
        .query_map(params![query, limit as i64], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

/// Uuids of live notes matching the given uuid prefix, most recent first.
pub fn find_uuids_by_prefix(conn: &Connection, prefix: &str, limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT uuid FROM notes WHERE deleted = 0 AND uuid LIKE ? ORDER BY added_on DESC LIMIT ?",
    )?;
    let uuids = stmt
        .query_map(params![format!("{prefix}%"), limit as i64], |row| {
            row.get(0)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(uuids)
}
