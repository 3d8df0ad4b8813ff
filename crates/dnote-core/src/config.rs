//! Persistent client configuration and session credentials.

use std::env;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::crypt;
use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_ENDPOINT: &str = "https://api.getdnote.com";

/// On-disk client configuration.
///
/// Credentials are written here by the login tooling; this crate only
/// reads them. Environment variables `DNOTE_ENDPOINT`, `DNOTE_SESSION_KEY`
/// and `DNOTE_CIPHER_KEY` override the stored values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub session_key: Option<String>,
    /// Base64-encoded 32-byte AEAD key.
    #[serde(default)]
    pub cipher_key: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            session_key: None,
            cipher_key: None,
        }
    }
}

/// Credentials a sync requires; both keys are present and well-formed.
#[derive(Clone)]
pub struct Session {
    pub endpoint: String,
    pub session_key: String,
    pub cipher_key: Vec<u8>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("session_key", &"[REDACTED]")
            .field("cipher_key", &"[REDACTED]")
            .finish()
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dnote")
        .join(CONFIG_FILE_NAME)
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from_path(&default_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|error| {
                Error::Config(format!("reading {}: {error}", path.display()))
            })?;
            serde_json::from_str::<Self>(&raw).map_err(|error| {
                Error::Config(format!("parsing {}: {error}", path.display()))
            })?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                Error::Config(format!("creating {}: {error}", parent.display()))
            })?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)
            .map_err(|error| Error::Config(format!("writing {}: {error}", path.display())))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(endpoint) = non_empty_env("DNOTE_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(session_key) = non_empty_env("DNOTE_SESSION_KEY") {
            self.session_key = Some(session_key);
        }
        if let Some(cipher_key) = non_empty_env("DNOTE_CIPHER_KEY") {
            self.cipher_key = Some(cipher_key);
        }
    }

    /// Extract the sync credentials, failing when either key is absent or
    /// the cipher key does not decode to the AEAD key size.
    pub fn session(&self) -> Result<Session> {
        let session_key = self
            .session_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(Error::NotAuthenticated)?;
        let cipher_key_b64 = self
            .cipher_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(Error::NotAuthenticated)?;

        let cipher_key = BASE64
            .decode(cipher_key_b64)
            .map_err(|error| Error::Config(format!("cipher_key is not valid base64: {error}")))?;
        if cipher_key.len() != crypt::KEY_SIZE {
            return Err(Error::Config(format!(
                "cipher_key must decode to {} bytes, got {}",
                crypt::KEY_SIZE,
                cipher_key.len()
            )));
        }

        Ok(Session {
            endpoint: self.endpoint.trim_end_matches('/').to_string(),
            session_key: session_key.to_string(),
            cipher_key,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys() -> Config {
        Config {
            endpoint: "https://api.example.com/".to_string(),
            session_key: Some("session".to_string()),
            cipher_key: Some(BASE64.encode([1u8; crypt::KEY_SIZE])),
        }
    }

    #[test]
    fn missing_keys_mean_not_authenticated() {
        let config = Config::default();
        assert!(matches!(config.session(), Err(Error::NotAuthenticated)));

        let mut half = config_with_keys();
        half.cipher_key = None;
        assert!(matches!(half.session(), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn session_decodes_cipher_key_and_trims_endpoint() {
        let session = config_with_keys().session().unwrap();
        assert_eq!(session.endpoint, "https://api.example.com");
        assert_eq!(session.cipher_key, vec![1u8; crypt::KEY_SIZE]);
    }

    #[test]
    fn wrong_cipher_key_size_is_a_config_error() {
        let mut config = config_with_keys();
        config.cipher_key = Some(BASE64.encode([1u8; 16]));
        assert!(matches!(config.session(), Err(Error::Config(_))));
    }

    #[test]
    fn load_from_missing_path_yields_defaults() {
        let config = Config::load_from_path(Path::new("/nonexistent/dnote/config.json")).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.session_key.is_none());
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = std::env::temp_dir().join(format!("dnote-config-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE_NAME);
        let config = config_with_keys();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn session_debug_redacts_credentials() {
        let session = config_with_keys().session().unwrap();
        let debug = format!("{session:?}");
        assert!(!debug.contains("session_key: \"session\""));
        assert!(debug.contains("[REDACTED]"));
    }
}
