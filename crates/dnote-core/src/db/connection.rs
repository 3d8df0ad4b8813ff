//! Database connection management

use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::migrate;

/// Database wrapper for `SQLite` connections
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Installs the base schema and runs the local migration sequence.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::bootstrap(conn)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(mut conn: Connection) -> Result<Self> {
        configure(&conn)?;
        init_schema(&conn)?;
        migrate::run(&mut conn, migrate::Sequence::Local, &migrate::Env::local())?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get a mutable reference to the underlying connection
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

/// Install the base schema the migration sequence starts from.
///
/// This is the oldest layout the tool ever shipped; `migrate::LOCAL_SEQUENCE`
/// carries it forward to the current one, so a fresh store and a store that
/// has lived through every release take the same path.
pub(crate) fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notes (
            id integer PRIMARY KEY AUTOINCREMENT,
            uuid text NOT NULL,
            book_uuid text NOT NULL,
            content text NOT NULL,
            added_on integer NOT NULL,
            edited_on integer DEFAULT 0,
            public bool DEFAULT false
        );
        CREATE TABLE IF NOT EXISTS books (
            uuid text PRIMARY KEY,
            label text NOT NULL
        );
        CREATE TABLE IF NOT EXISTS actions (
            uuid text PRIMARY KEY,
            schema integer NOT NULL,
            type text NOT NULL,
            data text NOT NULL,
            timestamp integer NOT NULL
        );
        CREATE TABLE IF NOT EXISTS system (
            key text PRIMARY KEY,
            value text NOT NULL
        );
        INSERT OR IGNORE INTO system (key, value) VALUES ('last_sync_at', '0');
        INSERT OR IGNORE INTO system (key, value) VALUES ('last_max_usn', '0');
        ",
    )?;
    Ok(())
}
