#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Annotation ingest.
//!
//! Takes a validated [`Annotation`] and its photo, derives the two object
//! keys (see [`keys`]) and writes the JSON record followed by the image
//! bytes to an [`ObjectStore`]. Both writes are create-only.
//!
//! The two writes are independent. If the image write fails after the
//! record was stored, the record stays in the bucket and the submission
//! reports the image failure; nothing is rolled back.

pub mod keys;

use building_survey_annotation_models::Annotation;
use building_survey_storage::{ObjectStore, StorageError};

pub use keys::ObjectKeys;

/// Content type used when the client does not send one for the image.
pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type of stored annotation records.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Errors that can occur while ingesting a submission.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Writing one of the objects failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The annotation could not be serialized.
    #[error("Failed to serialize annotation: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IngestError {
    /// Whether the submission collided with an existing object.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_already_exists())
    }
}

/// An uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Filename as sent by the client.
    pub filename: String,
    /// MIME type as sent by the client.
    pub content_type: Option<String>,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Persists `annotation` and `image` to `store`.
///
/// Returns the keys both objects were written to.
///
/// # Errors
///
/// Returns [`IngestError::Storage`] wrapping
/// [`StorageError::AlreadyExists`] if either key is already taken, or any
/// other storage failure.
pub async fn ingest(
    store: &dyn ObjectStore,
    annotation: &Annotation,
    image: ImageUpload,
) -> Result<ObjectKeys, IngestError> {
    let keys = ObjectKeys::new(annotation, &image.filename);
    let record = annotation.to_json_vec()?;

    log::info!("Storing annotation -> {}", store.uri(&keys.json));
    store
        .put_if_absent(&keys.json, record, JSON_CONTENT_TYPE)
        .await?;

    let content_type = image
        .content_type
        .as_deref()
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or(DEFAULT_IMAGE_CONTENT_TYPE)
        .to_string();

    #[allow(clippy::cast_precision_loss)] // display-only KB value
    let kb = image.bytes.len() as f64 / 1024.0;
    log::info!(
        "Storing image -> {} ({kb:.1} KB, {content_type})",
        store.uri(&keys.image)
    );
    if let Err(e) = store
        .put_if_absent(&keys.image, image.bytes, &content_type)
        .await
    {
        log::error!(
            "Image write failed after record was stored; {} has no image: {e}",
            store.uri(&keys.json)
        );
        return Err(e.into());
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use building_survey_storage::memory::MemoryObjectStore;

    use super::*;

    fn annotation(username: &str) -> Annotation {
        let json = serde_json::json!({
            "username": username,
            "building_id": "B1",
            "geo_coordinate": {"latitude": 1.0, "longitude": 2.0, "altitude": 3.0, "accuracy": 4.0},
            "date_time": "2024-01-01T00:00:00",
            "level": "Stilt",
            "no_of_storeys": 4,
            "use": ["Hospital"],
            "structure_type": "RCC Framed",
            "age": 12.5,
            "visual_analysis": ["Glass", "Concrete"]
        });
        Annotation::from_json(&json.to_string()).unwrap()
    }

    fn image(filename: &str) -> ImageUpload {
        ImageUpload {
            filename: filename.to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[tokio::test]
    async fn stores_record_and_image() {
        let store = MemoryObjectStore::new("surveys");
        let annotation = annotation("alice");

        let keys = ingest(&store, &annotation, image("house.jpg")).await.unwrap();

        assert_eq!(keys.json, "json/alice_B1_2024-01-01T00:00:00.json");
        assert_eq!(keys.image, "images/alice_B1_2024-01-01T00:00:00.jpg");

        let record = store.get(&keys.json).unwrap();
        assert_eq!(record.content_type, JSON_CONTENT_TYPE);
        let stored: Annotation = serde_json::from_slice(&record.body).unwrap();
        assert_eq!(stored, annotation);

        let photo = store.get(&keys.image).unwrap();
        assert_eq!(photo.content_type, "image/jpeg");
        assert_eq!(photo.body, [0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn identical_resubmission_is_refused() {
        let store = MemoryObjectStore::new("surveys");
        let annotation = annotation("alice");

        ingest(&store, &annotation, image("house.jpg")).await.unwrap();
        let err = ingest(&store, &annotation, image("house.jpg"))
            .await
            .unwrap_err();

        assert!(err.is_already_exists(), "{err}");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn different_surveyors_do_not_collide() {
        let store = MemoryObjectStore::new("surveys");

        ingest(&store, &annotation("alice"), image("a.jpg"))
            .await
            .unwrap();
        ingest(&store, &annotation("bob"), image("b.jpg"))
            .await
            .unwrap();

        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn image_conflict_leaves_record_in_place() {
        let store = MemoryObjectStore::new("surveys");
        let annotation = annotation("alice");
        let keys = ObjectKeys::new(&annotation, "house.jpg");

        store
            .put_if_absent(&keys.image, vec![1], "image/jpeg")
            .await
            .unwrap();

        let err = ingest(&store, &annotation, image("house.jpg"))
            .await
            .unwrap_err();

        assert!(err.is_already_exists());
        assert!(store.get(&keys.json).is_some());
        assert_eq!(store.get(&keys.image).unwrap().body, [1]);
    }

    #[tokio::test]
    async fn missing_content_type_falls_back_to_octet_stream() {
        let store = MemoryObjectStore::new("surveys");
        let upload = ImageUpload {
            content_type: None,
            ..image("scan.heic")
        };

        let keys = ingest(&store, &annotation("alice"), upload).await.unwrap();

        assert!(keys.image.ends_with(".heic"));
        assert_eq!(
            store.get(&keys.image).unwrap().content_type,
            DEFAULT_IMAGE_CONTENT_TYPE
        );
    }
}
