//! dnote-core - Core library for Dnote
//!
//! This crate contains the shared models, the SQLite store access layer,
//! the remote client, payload crypto, the synchronization engine, and the
//! schema-migration engine used by the Dnote command line interface.

pub mod client;
pub mod config;
pub mod crypt;
pub mod db;
pub mod error;
pub mod migrate;
pub mod models;
pub mod sync;

pub use config::{Config, Session};
pub use error::{Error, Result};
pub use models::{Book, Note};
