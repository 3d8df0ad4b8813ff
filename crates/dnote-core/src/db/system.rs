//! Scalar system state

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Last observed server wall clock, in seconds.
pub const LAST_SYNC_AT: &str = "last_sync_at";
/// Highest server USN the client has acknowledged integrating.
pub const LAST_MAX_USN: &str = "last_max_usn";
/// Index of the last applied local migration.
pub const LAST_MIGRATION_LOCAL: &str = "last_migration_local";
/// Index of the last applied remote migration.
pub const LAST_MIGRATION_REMOTE: &str = "last_migration_remote";

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM system WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn get_int(conn: &Connection, key: &str) -> Result<Option<i64>> {
    let value = conn
        .query_row(
            "SELECT CAST(value AS INTEGER) FROM system WHERE key = ?",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Read an integer system value, treating an absent key as the default.
pub fn get_int_or(conn: &Connection, key: &str, default: i64) -> Result<i64> {
    Ok(get_int(conn, key)?.unwrap_or(default))
}

pub fn upsert(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO system (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn upsert_int(conn: &Connection, key: &str, value: i64) -> Result<()> {
    upsert(conn, key, &value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn absent_key_reads_as_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(get(db.connection(), "no-such-key").unwrap(), None);
        assert_eq!(get_int_or(db.connection(), "no-such-key", 7).unwrap(), 7);
    }

    #[test]
    fn upsert_inserts_then_overwrites() {
        let db = Database::open_in_memory().unwrap();
        upsert_int(db.connection(), "counter", 1).unwrap();
        upsert_int(db.connection(), "counter", 2).unwrap();
        assert_eq!(get_int(db.connection(), "counter").unwrap(), Some(2));
    }
}
