//! Push engine.
//!
//! Scans dirty local state, books first and then notes, and replays it
//! against the server. Each response USN is checked against the local
//! high-water mark: a contiguous response advances it; anything else
//! means other clients intercalated writes and the client is behind.

use std::io::{self, Write};

use rusqlite::Connection;

use crate::client::Remote;
use crate::db::{books, notes, system};
use crate::error::Result;
use crate::models::{Book, Note};

/// Advance `last_max_usn` if the response is the expected next revision;
/// otherwise flag the client as behind.
fn track_response_usn(conn: &Connection, response_usn: i64, is_behind: &mut bool) -> Result<()> {
    let last_max_usn = system::get_int_or(conn, system::LAST_MAX_USN, 0)?;

    if response_usn == last_max_usn + 1 {
        system::upsert_int(conn, system::LAST_MAX_USN, last_max_usn + 1)?;
    } else {
        tracing::debug!(response_usn, last_max_usn, "response usn is not contiguous; client is behind");
        *is_behind = true;
    }
    Ok(())
}

/// Upload every dirty book. Returns whether the server got ahead.
pub(super) fn send_books(conn: &Connection, remote: &dyn Remote) -> Result<bool> {
    let mut is_behind = false;

    for book in books::list_dirty(conn)? {
        tracing::debug!(uuid = %book.uuid, "sending book");

        let response_usn = if book.usn == 0 {
            if book.deleted {
                // never reached the server; nothing to tell it
                books::expunge(conn, &book.uuid)?;
                continue;
            }

            let response = remote.create_book(&book.label)?;
            notes::rewrite_book_uuid(conn, &book.uuid, &response.uuid)?;
            books::update(
                conn,
                &Book {
                    usn: response.usn,
                    dirty: false,
                    ..book.clone()
                },
            )?;
            books::update_uuid(conn, &book.uuid, &response.uuid)?;
            response.usn
        } else if book.deleted {
            let response = remote.delete_book(&book.uuid)?;
            books::expunge(conn, &book.uuid)?;
            response.usn
        } else {
            let response = remote.update_book(&book.uuid, &book.label)?;
            books::update(
                conn,
                &Book {
                    usn: response.usn,
                    dirty: false,
                    ..book.clone()
                },
            )?;
            response.usn
        };

        track_response_usn(conn, response_usn, &mut is_behind)?;
    }

    Ok(is_behind)
}

/// Upload every dirty note. Returns whether the server got ahead.
pub(super) fn send_notes(conn: &Connection, remote: &dyn Remote) -> Result<bool> {
    let mut is_behind = false;

    for note in notes::list_dirty(conn)? {
        tracing::debug!(uuid = %note.uuid, "sending note");

        let response_usn = if note.usn == 0 {
            if note.deleted {
                // added and deleted without ever syncing; expunge silently
                notes::expunge(conn, &note.uuid)?;
                continue;
            }

            let response = remote.create_note(&note.book_uuid, &note.body)?;
            notes::update(
                conn,
                &Note {
                    usn: response.usn,
                    dirty: false,
                    ..note.clone()
                },
            )?;
            notes::update_uuid(conn, &note.uuid, &response.uuid)?;
            response.usn
        } else if note.deleted {
            let response = remote.delete_note(&note.uuid)?;
            notes::expunge(conn, &note.uuid)?;
            response.usn
        } else {
            let response =
                remote.update_note(&note.uuid, &note.book_uuid, &note.body, note.public)?;
            notes::update(
                conn,
                &Note {
                    usn: response.usn,
                    dirty: false,
                    ..note.clone()
                },
            )?;
            response.usn
        };

        track_response_usn(conn, response_usn, &mut is_behind)?;
    }

    Ok(is_behind)
}

/// Run the push phase, reporting progress on stdout.
pub(super) fn send_changes(conn: &Connection, remote: &dyn Remote) -> Result<bool> {
    print!("sending changes.");

    let total = books::count_dirty(conn)? + notes::count_dirty(conn)?;
    print!(" (total {total}).");
    let _ = io::stdout().flush();

    let books_behind = send_books(conn, remote)?;
    let notes_behind = send_notes(conn, remote)?;

    println!(" done.");

    Ok(books_behind || notes_behind)
}
