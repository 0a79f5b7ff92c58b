#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Building survey annotation schema and construction taxonomy.
//!
//! Defines the record a field surveyor submits for one building, the four
//! closed enumerations the survey form is built from, and the validation
//! applied to every inbound payload before anything is persisted.
//!
//! Enum values serialize to their human-readable labels (e.g.
//! `"RCC Framed"`), which are also what the form endpoints return.

pub mod timestamp;

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use timestamp::{ParseTimestampError, SurveyTimestamp};

/// Floor the surveyed entrance sits on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Level {
    /// Ground floor
    Ground,
    /// Raised on stilts
    Stilt,
    /// Anything else (see `other_level`)
    Other,
}

impl Level {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Ground, Self::Stilt, Self::Other]
    }
}

/// What a building is used for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum BuildingUse {
    /// Housing
    Residential,
    /// Shops, offices
    Commercial,
    /// Hospitals and clinics
    Hospital,
    /// Schools, colleges
    Institutional,
    /// Parks, theatres, sports facilities
    Recreational,
    /// Government offices
    Government,
    /// Places of worship
    Religious,
}

impl BuildingUse {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Residential,
            Self::Commercial,
            Self::Hospital,
            Self::Institutional,
            Self::Recreational,
            Self::Government,
            Self::Religious,
        ]
    }
}

/// Primary load-carrying structure.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum StructureType {
    /// Reinforced cement concrete frame
    #[serde(rename = "RCC Framed")]
    #[strum(serialize = "RCC Framed")]
    RccFramed,
    /// Load-bearing masonry walls
    #[serde(rename = "Load Bearing")]
    #[strum(serialize = "Load Bearing")]
    LoadBearing,
    /// Anything else (see `other_structure`)
    Other,
}

impl StructureType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::RccFramed, Self::LoadBearing, Self::Other]
    }
}

/// Facade material observed on the building.
///
/// `ACP` and `HPL` are also accepted in their short form on input; they are
/// always written back out with the full label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum VisualAnalysis {
    /// Exposed brickwork
    #[serde(rename = "Expose brick")]
    #[strum(serialize = "Expose brick")]
    ExposeBrick,
    /// Timber
    Wood,
    /// Aluminum composite panel
    #[serde(rename = "ACP - Aluminum composite panel", alias = "ACP")]
    #[strum(to_string = "ACP - Aluminum composite panel", serialize = "ACP")]
    Acp,
    /// Stone
    Stone,
    /// High pressure laminate
    #[serde(rename = "HPL - High Pressure Laminate", alias = "HPL")]
    #[strum(to_string = "HPL - High Pressure Laminate", serialize = "HPL")]
    Hpl,
    /// Glass
    Glass,
    /// Textured plaster
    #[serde(rename = "Textured Plaster")]
    #[strum(serialize = "Textured Plaster")]
    TexturedPlaster,
    /// Terracotta
    Terracotta,
    /// Metal cladding
    #[serde(rename = "Metal cladding")]
    #[strum(serialize = "Metal cladding")]
    MetalCladding,
    /// Ceramic slabs or tiles
    #[serde(rename = "Ceramic Slab/tiles")]
    #[strum(serialize = "Ceramic Slab/tiles")]
    CeramicTiles,
    /// Bare concrete
    Concrete,
    /// Plain painted finish
    #[serde(rename = "Plain paint")]
    #[strum(serialize = "Plain paint")]
    PlainPaint,
    /// Anything else (see `other_visual_analysis`)
    Other,
}

impl VisualAnalysis {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ExposeBrick,
            Self::Wood,
            Self::Acp,
            Self::Stone,
            Self::Hpl,
            Self::Glass,
            Self::TexturedPlaster,
            Self::Terracotta,
            Self::MetalCladding,
            Self::CeramicTiles,
            Self::Concrete,
            Self::PlainPaint,
            Self::Other,
        ]
    }
}

/// Device position at the time of capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f64,
    /// Horizontal accuracy in meters, as reported by the device.
    pub accuracy: f64,
}

/// One building survey record.
///
/// Field names are the wire names; `building_use` travels as `use`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Surveyor who captured the record.
    pub username: String,
    /// Surveyor-assigned building identifier.
    pub building_id: String,
    /// Street the building fronts onto.
    #[serde(default)]
    pub street_name: Option<String>,
    /// Where the photo was taken.
    pub geo_coordinate: GeoCoordinate,
    /// When the photo was taken.
    pub date_time: SurveyTimestamp,
    /// Entrance level.
    pub level: Level,
    /// Free-text level when `level` is [`Level::Other`].
    #[serde(default)]
    pub other_level: Option<String>,
    /// Number of storeys above the entrance level.
    pub no_of_storeys: i64,
    /// Building uses; at least one.
    #[serde(rename = "use")]
    pub building_use: Vec<BuildingUse>,
    /// Details for mixed-use buildings.
    #[serde(default)]
    pub multiple_spec: Option<String>,
    /// Structural system.
    pub structure_type: StructureType,
    /// Free-text structure when `structure_type` is [`StructureType::Other`].
    #[serde(default)]
    pub other_structure: Option<String>,
    /// How the age estimate was arrived at.
    #[serde(default)]
    pub age_analysis: Option<String>,
    /// Estimated age in years.
    pub age: f64,
    /// Facade materials; at least one.
    pub visual_analysis: Vec<VisualAnalysis>,
    /// Free-text material when `visual_analysis` contains
    /// [`VisualAnalysis::Other`].
    #[serde(default)]
    pub other_visual_analysis: Option<String>,
}

/// Reasons an inbound annotation payload is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Payload is not valid JSON, is missing a required field, has a field
    /// of the wrong type, or holds a value outside a closed enumeration.
    #[error("invalid annotation: {0}")]
    Json(#[from] serde_json::Error),

    /// A multi-select field was submitted with no selections.
    #[error("`{field}` must contain at least one value")]
    EmptySelection {
        /// Wire name of the field.
        field: &'static str,
    },

    /// A multi-select field holds the same value more than once.
    #[error("`{field}` contains {value:?} more than once")]
    DuplicateSelection {
        /// Wire name of the field.
        field: &'static str,
        /// The repeated value.
        value: String,
    },

    /// A numeric field is NaN or infinite.
    #[error("`{field}` must be a finite number")]
    NonFinite {
        /// Wire name of the field.
        field: &'static str,
    },
}

impl Annotation {
    /// Parses and validates an annotation from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Json`] if the text does not match the
    /// annotation shape, or another [`ValidationError`] variant if
    /// [`Annotation::validate`] fails.
    pub fn from_json(text: &str) -> Result<Self, ValidationError> {
        let annotation: Self = serde_json::from_str(text)?;
        annotation.validate()?;
        Ok(annotation)
    }

    /// Checks the invariants serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_finite("geo_coordinate.latitude", self.geo_coordinate.latitude)?;
        check_finite("geo_coordinate.longitude", self.geo_coordinate.longitude)?;
        check_finite("geo_coordinate.altitude", self.geo_coordinate.altitude)?;
        check_finite("geo_coordinate.accuracy", self.geo_coordinate.accuracy)?;
        check_finite("age", self.age)?;

        check_selection("use", &self.building_use)?;
        check_selection("visual_analysis", &self.visual_analysis)?;

        Ok(())
    }

    /// Serializes the annotation to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error only if serialization itself fails.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { field })
    }
}

fn check_selection<T>(field: &'static str, values: &[T]) -> Result<(), ValidationError>
where
    T: Copy + Eq + Hash + AsRef<str>,
{
    if values.is_empty() {
        return Err(ValidationError::EmptySelection { field });
    }

    let mut seen = HashSet::with_capacity(values.len());
    for value in values {
        if !seen.insert(*value) {
            return Err(ValidationError::DuplicateSelection {
                field,
                value: value.as_ref().to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "username": "alice",
            "building_id": "B1",
            "street_name": "MG Road",
            "geo_coordinate": {
                "latitude": 12.97,
                "longitude": 77.59,
                "altitude": 920.0,
                "accuracy": 4.5
            },
            "date_time": "2024-01-01T00:00:00",
            "level": "Ground",
            "other_level": null,
            "no_of_storeys": 3,
            "use": ["Residential", "Commercial"],
            "structure_type": "RCC Framed",
            "age": 25.0,
            "visual_analysis": ["Expose brick", "ACP"]
        })
    }

    fn parse(value: &serde_json::Value) -> Result<Annotation, ValidationError> {
        Annotation::from_json(&value.to_string())
    }

    fn labels<T: ToString>(values: &[T]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn enum_lists_follow_declaration_order() {
        assert_eq!(
            labels(Level::all()),
            ["Ground", "Stilt", "Other"]
        );
        assert_eq!(
            labels(BuildingUse::all()),
            [
                "Residential",
                "Commercial",
                "Hospital",
                "Institutional",
                "Recreational",
                "Government",
                "Religious"
            ]
        );
        assert_eq!(
            labels(StructureType::all()),
            ["RCC Framed", "Load Bearing", "Other"]
        );
        assert_eq!(
            labels(VisualAnalysis::all()),
            [
                "Expose brick",
                "Wood",
                "ACP - Aluminum composite panel",
                "Stone",
                "HPL - High Pressure Laminate",
                "Glass",
                "Textured Plaster",
                "Terracotta",
                "Metal cladding",
                "Ceramic Slab/tiles",
                "Concrete",
                "Plain paint",
                "Other"
            ]
        );
    }

    #[test]
    fn serde_labels_match_display() {
        for value in VisualAnalysis::all() {
            let json = serde_json::to_value(value).unwrap();
            assert_eq!(json, serde_json::Value::String(value.to_string()));
            assert_eq!(value.as_ref().parse::<VisualAnalysis>().unwrap(), *value);
        }
        for value in StructureType::all() {
            let json = serde_json::to_value(value).unwrap();
            assert_eq!(json, serde_json::Value::String(value.to_string()));
        }
    }

    #[test]
    fn short_material_labels_are_accepted() {
        let acp: VisualAnalysis = serde_json::from_str("\"ACP\"").unwrap();
        let hpl: VisualAnalysis = "HPL".parse().unwrap();
        assert_eq!(acp, VisualAnalysis::Acp);
        assert_eq!(hpl, VisualAnalysis::Hpl);
    }

    #[test]
    fn valid_payload_parses() {
        let annotation = parse(&sample_json()).unwrap();
        assert_eq!(annotation.username, "alice");
        assert_eq!(annotation.level, Level::Ground);
        assert_eq!(
            annotation.building_use,
            [BuildingUse::Residential, BuildingUse::Commercial]
        );
        assert_eq!(annotation.structure_type, StructureType::RccFramed);
        assert_eq!(
            annotation.visual_analysis,
            [VisualAnalysis::ExposeBrick, VisualAnalysis::Acp]
        );
        assert_eq!(annotation.date_time.to_string(), "2024-01-01T00:00:00");
        assert!(annotation.multiple_spec.is_none());
    }

    #[test]
    fn serialized_record_uses_wire_names() {
        let annotation = parse(&sample_json()).unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&annotation.to_json_vec().unwrap()).unwrap();
        assert_eq!(value["use"], serde_json::json!(["Residential", "Commercial"]));
        assert_eq!(
            value["visual_analysis"][1],
            "ACP - Aluminum composite panel"
        );
        assert_eq!(value["date_time"], "2024-01-01T00:00:00");
        assert!(value.get("building_use").is_none());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut json = sample_json();
        json.as_object_mut().unwrap().remove("username");
        let err = parse(&json).unwrap_err();
        assert!(matches!(err, ValidationError::Json(_)), "{err}");
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let mut json = sample_json();
        json["level"] = "Basement".into();
        assert!(matches!(parse(&json), Err(ValidationError::Json(_))));

        let mut json = sample_json();
        json["use"] = serde_json::json!(["Residential", "Industrial"]);
        assert!(matches!(parse(&json), Err(ValidationError::Json(_))));
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        let mut json = sample_json();
        json["no_of_storeys"] = "three".into();
        assert!(matches!(parse(&json), Err(ValidationError::Json(_))));

        let mut json = sample_json();
        json["no_of_storeys"] = 2.5_f64.into();
        assert!(matches!(parse(&json), Err(ValidationError::Json(_))));

        let mut json = sample_json();
        json["date_time"] = serde_json::json!({"year": 2024});
        assert!(matches!(parse(&json), Err(ValidationError::Json(_))));
    }

    #[test]
    fn lax_dates_are_accepted() {
        let mut json = sample_json();
        json["date_time"] = "2024-01-01".into();
        assert_eq!(
            parse(&json).unwrap().date_time.to_string(),
            "2024-01-01T00:00:00"
        );

        let mut json = sample_json();
        json["date_time"] = 1_704_067_200_i64.into();
        assert_eq!(
            parse(&json).unwrap().date_time.to_string(),
            "2024-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn empty_and_duplicate_selections_are_rejected() {
        let mut json = sample_json();
        json["use"] = serde_json::json!([]);
        assert!(matches!(
            parse(&json),
            Err(ValidationError::EmptySelection { field: "use" })
        ));

        let mut json = sample_json();
        json["visual_analysis"] = serde_json::json!(["Wood", "Glass", "Wood"]);
        match parse(&json) {
            Err(ValidationError::DuplicateSelection { field, value }) => {
                assert_eq!(field, "visual_analysis");
                assert_eq!(value, "Wood");
            }
            other => panic!("expected duplicate selection, got {other:?}"),
        }
    }

    #[test]
    fn free_text_identifiers_and_signed_counts_are_accepted() {
        for building_id in ["", "  ", "A/1", "a\\b"] {
            let mut json = sample_json();
            json["building_id"] = building_id.into();
            assert_eq!(parse(&json).unwrap().building_id, building_id);
        }

        let mut json = sample_json();
        json["no_of_storeys"] = (-1).into();
        assert_eq!(parse(&json).unwrap().no_of_storeys, -1);
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut annotation = parse(&sample_json()).unwrap();
        annotation.geo_coordinate.accuracy = f64::NAN;
        assert!(matches!(
            annotation.validate(),
            Err(ValidationError::NonFinite {
                field: "geo_coordinate.accuracy"
            })
        ));
    }
}
