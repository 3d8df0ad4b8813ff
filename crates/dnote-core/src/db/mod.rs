//! Store access layer for Dnote
//!
//! All reads and writes go through typed operations over a borrowed
//! connection handle, so the same functions serve both plain connections
//! and the single transaction a sync holds open.

pub mod books;
mod connection;
pub mod notes;
pub mod system;

pub use connection::Database;
pub(crate) use connection::init_schema;
