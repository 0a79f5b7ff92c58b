//! Storage key naming.
//!
//! Both objects for a submission share the stem
//! `{username}_{building_id}_{date_time}`, so a surveyor can only submit one
//! record per building per capture timestamp.

use building_survey_annotation_models::Annotation;

/// Prefix for annotation records.
pub const JSON_PREFIX: &str = "json/";

/// Prefix for uploaded photos.
pub const IMAGE_PREFIX: &str = "images/";

/// The pair of object keys a submission is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeys {
    /// `json/{stem}.json`
    pub json: String,
    /// `images/{stem}.{ext}`
    pub image: String,
}

impl ObjectKeys {
    /// Derives the keys for `annotation` with a photo named `image_filename`.
    #[must_use]
    pub fn new(annotation: &Annotation, image_filename: &str) -> Self {
        let stem = format!(
            "{}_{}_{}",
            annotation.username, annotation.building_id, annotation.date_time
        );
        let ext = file_extension(image_filename);

        Self {
            json: format!("{JSON_PREFIX}{stem}.json"),
            image: format!("{IMAGE_PREFIX}{stem}.{ext}"),
        }
    }
}

/// Everything after the last `.` in the final path component of
/// `filename`, case preserved.
///
/// Any directory part (up to the last `/` or `\`) is ignored, so the
/// extension never adds key levels. A name without a `.` is returned whole.
#[must_use]
pub fn file_extension(filename: &str) -> &str {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    name.rsplit('.').next().unwrap_or(name)
}
