use std::path::Path;

use dnote_core::client::HttpRemote;
use dnote_core::sync::{self, SyncOptions};
use dnote_core::Config;

use crate::commands::common::open_database;
use crate::error::CliError;

pub fn run_sync(full: bool, db_path: &Path) -> Result<(), CliError> {
    let config = Config::load()?;
    let session = config.session()?;

    let mut db = open_database(db_path)?;
    let remote = HttpRemote::new(session.clone())?;

    sync::sync(
        db.connection_mut(),
        &remote,
        &session.cipher_key,
        SyncOptions { full },
    )?;

    println!("success");
    Ok(())
}
