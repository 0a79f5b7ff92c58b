#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Create-only object storage for building survey uploads.
//!
//! Every write goes through [`ObjectStore::put_if_absent`], which must fail
//! with [`StorageError::AlreadyExists`] instead of overwriting an existing
//! object. That guard is the only coordination between concurrent
//! submissions: the second writer to a key loses.
//!
//! ## Backends
//!
//! - [`s3::S3ObjectStore`]: any S3-compatible service (AWS, Cloudflare R2,
//!   `MinIO`, GCS interoperability), using `If-None-Match: *`.
//! - [`local::LocalObjectStore`]: a directory tree on disk, using exclusive
//!   file creation.
//! - [`memory::MemoryObjectStore`]: a process-local map, for tests and
//!   throwaway development runs.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `STORAGE_BACKEND` | `s3` | `s3`, `local` or `memory` |
//! | `SURVEY_BUCKET` | `building-survey-data` | Bucket all uploads go to |
//! | `S3_ENDPOINT_URL` | (required for `s3`) | S3-compatible endpoint |
//! | `S3_REGION` | `auto` | Signing region |
//! | `S3_ACCESS_KEY_ID` | (required for `s3`) | Access key |
//! | `S3_SECRET_ACCESS_KEY` | (required for `s3`) | Secret key |
//! | `LOCAL_STORAGE_ROOT` | `data/storage` | Root directory for `local` |

pub mod local;
pub mod memory;
pub mod s3;

use std::path::PathBuf;
use std::sync::Arc;

/// Bucket used when `SURVEY_BUCKET` is not set.
pub const DEFAULT_BUCKET: &str = "building-survey-data";

/// Root directory used by the local backend when `LOCAL_STORAGE_ROOT` is
/// not set.
pub const DEFAULT_LOCAL_ROOT: &str = "data/storage";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The create-only precondition failed: an object is already stored at
    /// this key.
    #[error("Object already exists at {bucket}/{key}")]
    AlreadyExists {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },

    /// The backend rejected or failed the write.
    #[error("Failed to upload {bucket}/{key}: {source}")]
    Put {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying backend error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// Storage settings are present but unusable.
    #[error("Invalid storage configuration: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },

    /// I/O error reading or writing local files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this error is the create-only precondition failing.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// A bucket that only ever gains objects.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store writes to.
    fn bucket(&self) -> &str;

    /// Human-readable location of `key`, for logs.
    fn uri(&self, key: &str) -> String;

    /// Stores `body` at `key` unless an object already exists there.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the key is taken, or
    /// another [`StorageError`] if the backend fails.
    async fn put_if_absent(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

/// Which backend to build and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// S3-compatible remote bucket.
    S3(s3::S3Config),
    /// Directory tree on the local filesystem.
    Local {
        /// Directory containing one subdirectory per bucket.
        root: PathBuf,
        /// Bucket name.
        bucket: String,
    },
    /// In-process map; contents are lost on exit.
    Memory {
        /// Bucket name.
        bucket: String,
    },
}

impl StorageConfig {
    /// Reads the storage configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] for an unknown backend name,
    /// or [`StorageError::MissingEnv`] if the S3 backend is selected without
    /// its required variables.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`StorageConfig::from_env`], reading variables through
    /// `lookup`.
    ///
    /// # Errors
    ///
    /// See [`StorageConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        let bucket = lookup("SURVEY_BUCKET")
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        let backend = lookup("STORAGE_BACKEND").unwrap_or_else(|| "s3".to_string());

        match backend.trim().to_ascii_lowercase().as_str() {
            "s3" => {
                let require = |name: &str| {
                    lookup(name).ok_or_else(|| StorageError::MissingEnv {
                        name: name.to_string(),
                    })
                };
                Ok(Self::S3(s3::S3Config {
                    endpoint_url: require("S3_ENDPOINT_URL")?,
                    region: lookup("S3_REGION").unwrap_or_else(|| "auto".to_string()),
                    access_key_id: require("S3_ACCESS_KEY_ID")?,
                    secret_access_key: require("S3_SECRET_ACCESS_KEY")?,
                    bucket,
                }))
            }
            "local" => Ok(Self::Local {
                root: lookup("LOCAL_STORAGE_ROOT")
                    .map_or_else(|| PathBuf::from(DEFAULT_LOCAL_ROOT), PathBuf::from),
                bucket,
            }),
            "memory" => Ok(Self::Memory { bucket }),
            other => Err(StorageError::InvalidConfig {
                message: format!("unknown STORAGE_BACKEND {other:?} (expected s3, local or memory)"),
            }),
        }
    }

    /// Bucket the configured backend writes to.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3(config) => &config.bucket,
            Self::Local { bucket, .. } | Self::Memory { bucket } => bucket,
        }
    }

    /// Replaces the bucket name.
    #[must_use]
    pub fn with_bucket(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match &mut self {
            Self::S3(config) => config.bucket = name,
            Self::Local { bucket, .. } | Self::Memory { bucket } => *bucket = name,
        }
        self
    }

    /// Builds the configured backend.
    #[must_use]
    pub fn into_store(self) -> Arc<dyn ObjectStore> {
        match self {
            Self::S3(config) => {
                log::info!(
                    "Using S3 storage at {} (bucket {})",
                    config.endpoint_url,
                    config.bucket
                );
                Arc::new(s3::S3ObjectStore::new(&config))
            }
            Self::Local { root, bucket } => {
                log::info!(
                    "Using local storage under {} (bucket {bucket})",
                    root.display()
                );
                Arc::new(local::LocalObjectStore::new(root, bucket))
            }
            Self::Memory { bucket } => {
                log::warn!("Using in-memory storage (bucket {bucket}); uploads are not persisted");
                Arc::new(memory::MemoryObjectStore::new(bucket))
            }
        }
    }
}
