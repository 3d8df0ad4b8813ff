//! Synchronization engine.
//!
//! One sync is a single transaction over the local store: an optional
//! pull (full or incremental) followed by a push of dirty local state,
//! plus one follow-up incremental pull when the push discovers the
//! server moved ahead. Any failure rolls the whole transaction back, so
//! the local store either integrates a sync completely or not at all.

pub mod list;
mod merge;
mod push;
#[cfg(test)]
pub(crate) mod testing;

use std::io::{self, Write};

use rusqlite::Connection;

use crate::client::Remote;
use crate::db::system;
use crate::error::Result;
use crate::migrate;

pub use list::SyncList;

/// Operator choices for one sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Pull all server state from USN 0 and reconcile wholesale.
    pub full: bool,
}

/// Run one complete sync against the server.
///
/// Remote migrations run first in their own transactions; everything
/// after shares one transaction that commits only at the very end.
pub fn sync(
    conn: &mut Connection,
    remote: &dyn Remote,
    cipher_key: &[u8],
    options: SyncOptions,
) -> Result<()> {
    migrate::run(conn, migrate::Sequence::Remote, &migrate::Env::with_remote(remote))?;

    let tx = conn.transaction()?;

    let state = remote.get_sync_state()?;
    let last_sync_at = system::get_int_or(&tx, system::LAST_SYNC_AT, 0)?;
    let last_max_usn = system::get_int_or(&tx, system::LAST_MAX_USN, 0)?;
    tracing::debug!(
        last_sync_at,
        last_max_usn,
        server_max_usn = state.max_usn,
        full_sync_before = state.full_sync_before,
        "starting sync"
    );

    if options.full || last_sync_at < state.full_sync_before {
        full_sync(&tx, remote, cipher_key)?;
    } else if last_max_usn != state.max_usn {
        step_sync(&tx, remote, cipher_key, last_max_usn)?;
    } else {
        // nothing to pull; note the server clock and move on to pushing
        system::upsert_int(&tx, system::LAST_SYNC_AT, state.current_time)?;
    }

    let is_behind = push::send_changes(&tx, remote)?;

    if is_behind {
        tracing::debug!("server advanced during push; running a follow-up step sync");
        let updated_last_max_usn = system::get_int_or(&tx, system::LAST_MAX_USN, 0)?;
        step_sync(&tx, remote, cipher_key, updated_last_max_usn)?;
    }

    tx.commit()?;
    Ok(())
}

/// Pull everything from USN 0 and reconcile the local store wholesale,
/// expunging local rows the server no longer accounts for.
fn full_sync(conn: &Connection, remote: &dyn Remote, cipher_key: &[u8]) -> Result<()> {
    tracing::debug!("performing a full sync");
    print!("resolving delta.");
    let _ = io::stdout().flush();

    let list = list::get_sync_list(remote, cipher_key, 0)?;
    print!(" (total {}).", list.len());
    let _ = io::stdout().flush();

    merge::clean_local_notes(conn, &list)?;
    merge::clean_local_books(conn, &list)?;

    for note in list.notes.values() {
        merge::full_sync_note(conn, note)?;
    }
    for book in list.books.values() {
        merge::full_sync_book(conn, book)?;
    }

    for note_uuid in &list.expunged_notes {
        merge::apply_expunged_note(conn, note_uuid)?;
    }
    for book_uuid in &list.expunged_books {
        merge::apply_expunged_book(conn, book_uuid)?;
    }

    save_sync_state(conn, list.max_current_time, list.max_usn)?;

    println!(" done.");
    Ok(())
}

/// Pull only the delta above `after_usn` and merge it in.
fn step_sync(conn: &Connection, remote: &dyn Remote, cipher_key: &[u8], after_usn: i64) -> Result<()> {
    tracing::debug!(after_usn, "performing a step sync");
    print!("resolving delta.");
    let _ = io::stdout().flush();

    let list = list::get_sync_list(remote, cipher_key, after_usn)?;
    print!(" (total {}).", list.len());
    let _ = io::stdout().flush();

    for note in list.notes.values() {
        merge::step_sync_note(conn, note)?;
    }
    for book in list.books.values() {
        merge::step_sync_book(conn, book)?;
    }

    for note_uuid in &list.expunged_notes {
        merge::apply_expunged_note(conn, note_uuid)?;
    }
    for book_uuid in &list.expunged_books {
        merge::apply_expunged_book(conn, book_uuid)?;
    }

    save_sync_state(conn, list.max_current_time, list.max_usn)?;

    println!(" done.");
    Ok(())
}

/// Persist the observed server clock and USN high-water mark.
///
/// The mark never moves backwards; an empty delta reports 0 and must not
/// regress what earlier pulls integrated.
fn save_sync_state(conn: &Connection, server_time: i64, server_max_usn: i64) -> Result<()> {
    let last_max_usn = system::get_int_or(conn, system::LAST_MAX_USN, 0)?;
    system::upsert_int(conn, system::LAST_MAX_USN, last_max_usn.max(server_max_usn))?;
    system::upsert_int(conn, system::LAST_SYNC_AT, server_time)?;
    Ok(())
}
