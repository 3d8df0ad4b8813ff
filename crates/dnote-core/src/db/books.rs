//! Typed store operations for books

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::Book;

fn from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        uuid: row.get(0)?,
        label: row.get(1)?,
        usn: row.get(2)?,
        dirty: row.get(3)?,
        deleted: row.get(4)?,
    })
}

const COLUMNS: &str = "uuid, label, usn, dirty, deleted";

pub fn get(conn: &Connection, uuid: &str) -> Result<Option<Book>> {
    let book = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM books WHERE uuid = ?"),
            params![uuid],
            from_row,
        )
        .optional()?;
    Ok(book)
}

/// Look up a live book by its exact label.
pub fn get_live_by_label(conn: &Connection, label: &str) -> Result<Option<Book>> {
    let book = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM books WHERE label = ? AND deleted = 0"),
            params![label],
            from_row,
        )
        .optional()?;
    Ok(book)
}

/// Count live books carrying the given label.
pub fn count_live_with_label(conn: &Connection, label: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT count(*) FROM books WHERE label = ? AND deleted = 0",
        params![label],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// All live books, ordered by label.
pub fn list_live(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM books WHERE deleted = 0 ORDER BY label"
    ))?;
    let books = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(books)
}

/// Every book row, live or tombstoned. Used by the full-sync cleanup scan.
pub fn list_all(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM books"))?;
    let books = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(books)
}

/// Snapshot of the books that carry unsynced changes.
pub fn list_dirty(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM books WHERE dirty = 1"))?;
    let books = stmt
        .query_map([], from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(books)
}

pub fn count_dirty(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT count(*) FROM books WHERE dirty = 1", [], |row| {
        row.get(0)
    })?;
    Ok(count)
}

pub fn insert(conn: &Connection, book: &Book) -> Result<()> {
    conn.execute(
        "INSERT INTO books (uuid, label, usn, dirty, deleted) VALUES (?, ?, ?, ?, ?)",
        params![book.uuid, book.label, book.usn, book.dirty, book.deleted],
    )?;
    Ok(())
}

/// Overwrite every mutable field of the row identified by `book.uuid`.
pub fn update(conn: &Connection, book: &Book) -> Result<()> {
    conn.execute(
        "UPDATE books SET label = ?, usn = ?, dirty = ?, deleted = ? WHERE uuid = ?",
        params![book.label, book.usn, book.dirty, book.deleted, book.uuid],
    )?;
    Ok(())
}

/// Replace a book's uuid, e.g. when the first upload returns the
/// server-assigned identity.
pub fn update_uuid(conn: &Connection, old_uuid: &str, new_uuid: &str) -> Result<()> {
    conn.execute(
        "UPDATE books SET uuid = ? WHERE uuid = ?",
        params![new_uuid, old_uuid],
    )?;
    Ok(())
}

pub fn mark_dirty(conn: &Connection, uuid: &str) -> Result<()> {
    conn.execute("UPDATE books SET dirty = 1 WHERE uuid = ?", params![uuid])?;
    Ok(())
}

/// Hard-delete the row. Distinct from the `deleted` tombstone.
pub fn expunge(conn: &Connection, uuid: &str) -> Result<()> {
    conn.execute("DELETE FROM books WHERE uuid = ?", params![uuid])?;
    Ok(())
}

/// Resolve a label collision by appending an increasing counter.
///
/// Produces `"label (2)"`, `"label (3)"`, … and returns the first variant
/// no live book holds.
pub fn resolve_label(conn: &Connection, label: &str) -> Result<String> {
    for i in 2.. {
        let candidate = format!("{label} ({i})");
        if count_live_with_label(conn, &candidate)? == 0 {
            return Ok(candidate);
        }
    }
    unreachable!("label counter space exhausted")
}
