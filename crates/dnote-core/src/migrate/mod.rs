//! Schema migration engine.
//!
//! Two ordered sequences of named, once-only migrations: the local
//! sequence covers pure schema/data changes and runs whenever the store
//! is opened; the remote sequence needs server calls and runs before a
//! sync. The highest applied index of each sequence is persisted in the
//! `system` table, each entry runs in its own transaction, and the index
//! advances inside that same transaction. A failed entry rolls back
//! whole and is retried on the next invocation.

mod local;
mod remote;

use rusqlite::{Connection, Transaction};

use crate::client::Remote;
use crate::db::system;
use crate::error::{Error, Result};

/// Collaborators a migration body may use besides the transaction.
pub struct Env<'a> {
    pub remote: Option<&'a dyn Remote>,
}

impl<'a> Env<'a> {
    /// Environment for the local sequence; no server access.
    #[must_use]
    pub const fn local() -> Self {
        Self { remote: None }
    }

    /// Environment for the remote sequence.
    #[must_use]
    pub const fn with_remote(remote: &'a dyn Remote) -> Self {
        Self {
            remote: Some(remote),
        }
    }
}

/// Which migration sequence to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Local,
    Remote,
}

/// A named migration body.
///
/// Bodies must be idempotent or strictly guarded by the persisted index,
/// forward-only, and may assume they run inside a transaction.
pub struct Migration {
    pub name: &'static str,
    pub run: fn(&Env<'_>, &Transaction<'_>) -> Result<()>,
}

/// Run every pending entry of the given sequence, in order.
pub fn run(conn: &mut Connection, sequence: Sequence, env: &Env<'_>) -> Result<()> {
    let (key, migrations) = match sequence {
        Sequence::Local => (system::LAST_MIGRATION_LOCAL, local::SEQUENCE),
        Sequence::Remote => (system::LAST_MIGRATION_REMOTE, remote::SEQUENCE),
    };
    run_sequence(conn, key, migrations, env)
}

fn run_sequence(
    conn: &mut Connection,
    index_key: &str,
    migrations: &[Migration],
    env: &Env<'_>,
) -> Result<()> {
    let applied = system::get_int_or(conn, index_key, 0)?;

    for (offset, migration) in migrations.iter().enumerate() {
        let position = offset as i64 + 1;
        if position <= applied {
            continue;
        }

        tracing::debug!(name = migration.name, position, "running migration");

        let tx = conn.transaction()?;
        (migration.run)(env, &tx).map_err(|error| Error::migration(migration.name, error))?;
        system::upsert_int(&tx, index_key, position)
            .map_err(|error| Error::migration(migration.name, error))?;
        tx.commit()
            .map_err(|error| Error::migration(migration.name, Error::Store(error)))?;
    }

    Ok(())
}
