//! Error types for dnote-core

use thiserror::Error;

/// Result type alias using dnote-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dnote-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Session key or cipher key is missing
    #[error("not logged in")]
    NotAuthenticated,

    /// A server call failed before a response was produced
    #[error("{op}: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{op}: server returned HTTP {status}: {message}")]
    Api {
        op: &'static str,
        status: u16,
        message: String,
    },

    /// AEAD verification or ciphertext decoding failed
    #[error("decrypting {context}: {reason}")]
    Decrypt { context: String, reason: String },

    /// Database error
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A state the protocol rules out; indicates corruption or a bug
    #[error("protocol invariant violated: {0}")]
    Protocol(String),

    /// A migration body failed; its transaction was rolled back
    #[error("running migration {name}: {source}")]
    Migration {
        name: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps an error as the failure of the named migration.
    pub fn migration(name: &'static str, source: Error) -> Self {
        Self::Migration {
            name,
            source: Box::new(source),
        }
    }
}
