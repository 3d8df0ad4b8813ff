//! Merge engine.
//!
//! Reconciles the server's view of a book or note with the local record.
//! Incremental (`step_sync_*`) steps apply unconditionally; full
//! (`full_sync_*`) steps skip records the local store already has at the
//! server's revision. Server-side deletions and the full-sync orphan
//! cleanup live here too.

use rusqlite::Connection;

use crate::client::{SyncFragBook, SyncFragNote};
use crate::db::{books, notes};
use crate::error::{Error, Result};
use crate::models::{Book, Note};

use super::list::SyncList;

/// Insert the server's book, renaming a live local book that already
/// holds the label.
fn insert_book(conn: &Connection, server: &SyncFragBook) -> Result<()> {
    if let Some(colliding) = books::get_live_by_label(conn, &server.label)? {
        let renamed = books::resolve_label(conn, &server.label)?;
        tracing::debug!(uuid = %colliding.uuid, from = %server.label, to = %renamed, "resolving label collision");
        books::update(
            conn,
            &Book {
                label: renamed,
                dirty: true,
                ..colliding
            },
        )?;
    }

    books::insert(conn, &Book::new(&server.uuid, &server.label, server.usn))?;
    Ok(())
}

/// Overwrite the local record from the server's copy.
///
/// Local edits lose wholesale when the local copy is dirty; a field-level
/// resolver would replace this function.
fn overwrite_book(conn: &Connection, server: &SyncFragBook, local: &Book) -> Result<()> {
    books::update(
        conn,
        &Book {
            uuid: server.uuid.clone(),
            label: server.label.clone(),
            usn: server.usn,
            dirty: local.dirty,
            deleted: server.deleted,
        },
    )
}

pub(super) fn step_sync_book(conn: &Connection, server: &SyncFragBook) -> Result<()> {
    match books::get(conn, &server.uuid)? {
        None => insert_book(conn, server),
        Some(local) => overwrite_book(conn, server, &local),
    }
}

pub(super) fn full_sync_book(conn: &Connection, server: &SyncFragBook) -> Result<()> {
    match books::get(conn, &server.uuid)? {
        None => insert_book(conn, server),
        Some(local) if server.usn > local.usn => overwrite_book(conn, server, &local),
        Some(_) => Ok(()),
    }
}

fn insert_note(conn: &Connection, server: &SyncFragNote) -> Result<()> {
    notes::insert(
        conn,
        &Note {
            uuid: server.uuid.clone(),
            book_uuid: server.book_uuid.clone(),
            body: server.body.clone(),
            added_on: server.added_on,
            edited_on: server.edited_on,
            public: server.public,
            usn: server.usn,
            dirty: false,
            deleted: server.deleted,
        },
    )
}

/// Overwrite the local note from the server's copy.
///
/// A note whose book is locally tombstoned is left alone; the book's
/// deletion will collect it. A locally tombstoned note that the server
/// edited comes back clean: server edits supersede the local deletion.
/// As with books, dirty local edits lose wholesale for now.
fn merge_note(conn: &Connection, server: &SyncFragNote, local: &Note) -> Result<()> {
    let book = books::get(conn, &local.book_uuid)?.ok_or_else(|| {
        Error::Protocol(format!(
            "note {} references missing book {}",
            local.uuid, local.book_uuid
        ))
    })?;
    if book.deleted {
        return Ok(());
    }

    let dirty = if local.deleted { false } else { local.dirty };
    notes::update(
        conn,
        &Note {
            uuid: server.uuid.clone(),
            book_uuid: server.book_uuid.clone(),
            body: server.body.clone(),
            added_on: local.added_on,
            edited_on: server.edited_on,
            public: server.public,
            usn: server.usn,
            dirty,
            deleted: server.deleted,
        },
    )
}

pub(super) fn step_sync_note(conn: &Connection, server: &SyncFragNote) -> Result<()> {
    match notes::get(conn, &server.uuid)? {
        None => insert_note(conn, server),
        Some(local) => merge_note(conn, server, &local),
    }
}

pub(super) fn full_sync_note(conn: &Connection, server: &SyncFragNote) -> Result<()> {
    match notes::get(conn, &server.uuid)? {
        None => insert_note(conn, server),
        Some(local) if server.usn > local.usn => merge_note(conn, server, &local),
        Some(_) => Ok(()),
    }
}

/// Apply a server-side note deletion: expunge unless local edits exist.
pub(super) fn apply_expunged_note(conn: &Connection, uuid: &str) -> Result<()> {
    let Some(local) = notes::get(conn, uuid)? else {
        return Ok(());
    };

    // a dirty local copy resurrects the note server-side on push
    if !local.dirty {
        notes::expunge(conn, uuid)?;
    }
    Ok(())
}

/// Apply a server-side book deletion.
///
/// A dirty book is left for push. A clean book holding dirty notes is
/// marked dirty instead of deleted, so the push phase un-deletes it
/// server-side rather than stranding the notes. Otherwise the book and
/// its notes are expunged.
pub(super) fn apply_expunged_book(conn: &Connection, uuid: &str) -> Result<()> {
    let Some(local) = books::get(conn, uuid)? else {
        return Ok(());
    };
    if local.dirty {
        return Ok(());
    }

    if notes::any_dirty_in_book(conn, uuid)? {
        books::mark_dirty(conn, uuid)?;
        return Ok(());
    }

    notes::expunge_by_book(conn, uuid)?;
    books::expunge(conn, uuid)?;
    Ok(())
}

/// Expunge local notes a full server listing does not account for.
///
/// The only acceptable absence is a brand-new local note awaiting its
/// first upload; anything else is residue of an earlier failure.
pub(super) fn clean_local_notes(conn: &Connection, full_list: &SyncList) -> Result<()> {
    for note in notes::list_all(conn)? {
        if !full_list.contains_note(&note.uuid) && !(note.dirty && note.usn == 0) {
            tracing::debug!(uuid = %note.uuid, "expunging orphaned note");
            notes::expunge(conn, &note.uuid)?;
        }
    }
    Ok(())
}

/// Expunge local books a full server listing does not account for.
pub(super) fn clean_local_books(conn: &Connection, full_list: &SyncList) -> Result<()> {
    for book in books::list_all(conn)? {
        if !full_list.contains_book(&book.uuid) && !(book.dirty && book.usn == 0) {
            tracing::debug!(uuid = %book.uuid, "expunging orphaned book");
            books::expunge(conn, &book.uuid)?;
        }
    }
    Ok(())
}
