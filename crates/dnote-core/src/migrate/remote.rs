//! The remote migration sequence.
//!
//! Entries here need server calls; they run right before a sync, once the
//! session is known to be valid.

use rusqlite::{params, OptionalExtension, Transaction};

use crate::db::notes;
use crate::error::{Error, Result};

use super::{Env, Migration};

pub(super) const SEQUENCE: &[Migration] = &[Migration {
    name: "sync-book-uuids-from-server",
    run: sync_book_uuids,
}];

/// Adopt the server's book uuids for local books matched by label.
///
/// Labels must be unique locally when this runs; earlier local migrations
/// guarantee that, and the guard below turns a violation into a hard error
/// instead of silently rewriting the wrong book.
fn sync_book_uuids(env: &Env<'_>, tx: &Transaction<'_>) -> Result<()> {
    let remote = env.remote.ok_or(Error::NotAuthenticated)?;

    let duplicated: Option<String> = tx
        .query_row(
            "SELECT label FROM books GROUP BY label HAVING count(*) > 1 LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(label) = duplicated {
        return Err(Error::Protocol(format!(
            "book label {label:?} is not unique; cannot adopt server uuids by label"
        )));
    }

    for book in remote.get_books()? {
        let original: Option<String> = tx
            .query_row(
                "SELECT uuid FROM books WHERE label = ?",
                params![book.label],
                |row| row.get(0),
            )
            .optional()?;
        let Some(original_uuid) = original else {
            continue;
        };

        tracing::debug!(label = %book.label, %original_uuid, server_uuid = %book.uuid, "adopting server book uuid");

        tx.execute(
            "UPDATE books SET uuid = ? WHERE label = ?",
            params![book.uuid, book.label],
        )?;
        notes::rewrite_book_uuid(tx, &original_uuid, &book.uuid)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        BookItem, BookResult, NoteResult, Remote, SyncFragment, SyncState,
    };
    use crate::db;
    use crate::migrate::{self, Sequence};
    use rusqlite::Connection;

    struct BookListRemote {
        books: Vec<BookItem>,
    }

    impl Remote for BookListRemote {
        fn get_books(&self) -> Result<Vec<BookItem>> {
            Ok(self.books.clone())
        }

        fn get_sync_state(&self) -> Result<SyncState> {
            unimplemented!()
        }
        fn get_sync_fragment(&self, _: i64) -> Result<SyncFragment> {
            unimplemented!()
        }
        fn create_book(&self, _: &str) -> Result<BookResult> {
            unimplemented!()
        }
        fn update_book(&self, _: &str, _: &str) -> Result<BookResult> {
            unimplemented!()
        }
        fn delete_book(&self, _: &str) -> Result<BookResult> {
            unimplemented!()
        }
        fn create_note(&self, _: &str, _: &str) -> Result<NoteResult> {
            unimplemented!()
        }
        fn update_note(&self, _: &str, _: &str, _: &str, _: bool) -> Result<NoteResult> {
            unimplemented!()
        }
        fn delete_note(&self, _: &str) -> Result<NoteResult> {
            unimplemented!()
        }
    }

    fn migrated_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let mut conn = conn;
        migrate::run(&mut conn, Sequence::Local, &Env::local()).unwrap();
        conn
    }

    fn seed_book(conn: &Connection, uuid: &str, label: &str) {
        conn.execute(
            "INSERT INTO books (uuid, label) VALUES (?, ?)",
            params![uuid, label],
        )
        .unwrap();
    }

    fn seed_note(conn: &Connection, uuid: &str, book_uuid: &str) {
        conn.execute(
            "INSERT INTO notes (uuid, book_uuid, body, added_on) VALUES (?, ?, 'x', 1)",
            params![uuid, book_uuid],
        )
        .unwrap();
    }

    #[test]
    fn adopts_server_uuids_and_repoints_notes() {
        let mut conn = migrated_conn();
        seed_book(&conn, "local-js", "js");
        seed_book(&conn, "local-go", "go");
        seed_note(&conn, "n1", "local-js");
        seed_note(&conn, "n2", "local-go");

        let remote = BookListRemote {
            books: vec![
                BookItem {
                    uuid: "srv-js".to_string(),
                    label: "js".to_string(),
                },
                BookItem {
                    uuid: "srv-absent".to_string(),
                    label: "absent-locally".to_string(),
                },
            ],
        };

        migrate::run(&mut conn, Sequence::Remote, &Env::with_remote(&remote)).unwrap();

        let js_uuid: String = conn
            .query_row("SELECT uuid FROM books WHERE label = 'js'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(js_uuid, "srv-js");

        let n1_book: String = conn
            .query_row("SELECT book_uuid FROM notes WHERE uuid = 'n1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(n1_book, "srv-js");

        // unrelated book untouched, absent server book ignored
        let n2_book: String = conn
            .query_row("SELECT book_uuid FROM notes WHERE uuid = 'n2'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(n2_book, "local-go");
        let count: i64 = conn
            .query_row("SELECT count(*) FROM books", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn duplicate_labels_abort_the_migration() {
        let mut conn = migrated_conn();
        seed_book(&conn, "b1", "js");
        seed_book(&conn, "b2", "js");

        let remote = BookListRemote { books: vec![] };
        let err = migrate::run(&mut conn, Sequence::Remote, &Env::with_remote(&remote)).unwrap_err();
        assert!(matches!(err, Error::Migration { .. }));

        // index did not advance, so the entry retries next invocation
        let applied = crate::db::system::get_int(
            &conn,
            crate::db::system::LAST_MIGRATION_REMOTE,
        )
        .unwrap();
        assert_eq!(applied, None);
    }

    #[test]
    fn requires_a_remote_collaborator() {
        let mut conn = migrated_conn();
        let err = migrate::run(&mut conn, Sequence::Remote, &Env::local()).unwrap_err();
        assert!(matches!(err, Error::Migration { .. }));
    }
}
