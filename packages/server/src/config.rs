//! Server settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `BIND_ADDR` | `127.0.0.1` |
//! | `PORT` | `8080` |
//! | `STATIC_DIR` | `static` |
//! | `MAX_UPLOAD_BYTES` | 20 MiB |
//!
//! Storage variables are documented in [`building_survey_storage`].

use std::path::PathBuf;

use building_survey_storage::{StorageConfig, StorageError};

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default directory for the bundled static site.
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Default per-image upload limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Everything needed to start the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
    /// Largest accepted image, in bytes.
    pub max_upload_bytes: usize,
    /// Where submissions are stored.
    pub storage: StorageConfig,
}

impl ServerConfig {
    /// Reads the configuration from environment variables.
    ///
    /// Unparseable numeric values fall back to their defaults with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the storage configuration is invalid.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`], reading variables through
    /// `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            static_dir: lookup("STATIC_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            storage: StorageConfig::from_lookup(&lookup)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparseable {name}={raw:?}");
            default
        }),
        None => default,
    }
}
