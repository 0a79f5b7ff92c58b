//! Filesystem backend.
//!
//! Objects live at `<root>/<bucket>/<key>`. Files are opened with
//! `create_new`, so an existing file fails the write atomically.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncWriteExt as _;

use crate::{ObjectStore, StorageError};

/// Object store backed by a local directory.
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
}

impl LocalObjectStore {
    /// Creates a store rooted at `root` writing into `bucket`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    /// Filesystem path for `key`, or `None` if the key would escape the
    /// bucket directory.
    #[must_use]
    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(&self.bucket).join(relative))
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn uri(&self, key: &str) -> String {
        format!("file://{}/{}/{key}", self.root.display(), self.bucket)
    }

    async fn put_if_absent(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.path_for(key).ok_or_else(|| StorageError::Put {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            source: "key is not a relative path".into(),
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists {
                    bucket: self.bucket.clone(),
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(&body).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Don't leave a truncated object holding the key.
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        log::debug!(
            "  stored {} ({} bytes, {content_type})",
            path.display(),
            body.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "building_survey_storage_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn writes_once_then_refuses() {
        let root = temp_root("once");
        let store = LocalObjectStore::new(&root, "surveys");

        store
            .put_if_absent("json/a_B1_t.json", b"{}".to_vec(), "application/json")
            .await
            .unwrap();

        let on_disk = std::fs::read(root.join("surveys/json/a_B1_t.json")).unwrap();
        assert_eq!(on_disk, b"{}");

        let err = store
            .put_if_absent("json/a_B1_t.json", b"[]".to_vec(), "application/json")
            .await
            .unwrap_err();
        assert!(err.is_already_exists(), "{err}");

        let on_disk = std::fs::read(root.join("surveys/json/a_B1_t.json")).unwrap();
        assert_eq!(on_disk, b"{}", "existing object must not be overwritten");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let root = temp_root("escape");
        let store = LocalObjectStore::new(&root, "surveys");

        assert!(store.path_for("../outside").is_none());
        assert!(store.path_for("/etc/passwd").is_none());
        assert!(store.path_for("").is_none());

        let err = store
            .put_if_absent("images/../../x.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Put { .. }));

        let _ = std::fs::remove_dir_all(&root);
    }
}
