//! HTTP handler functions for the building survey API.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use building_survey_annotation::ingest;
use building_survey_annotation_models::{
    Annotation, BuildingUse, Level, StructureType, VisualAnalysis,
};
use building_survey_server_models::{ApiHealth, ApiMessage};

use crate::AppState;
use crate::error::ApiError;
use crate::form::{self, DATA_FIELD, IMAGE_FIELD};

/// `GET /test`
pub async fn hello() -> HttpResponse {
    HttpResponse::Ok().json(ApiMessage::new("Hello World"))
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /level`
pub async fn levels() -> HttpResponse {
    HttpResponse::Ok().json(Level::all())
}

/// `GET /use`
pub async fn building_uses() -> HttpResponse {
    HttpResponse::Ok().json(BuildingUse::all())
}

/// `GET /structre`
pub async fn structure_types() -> HttpResponse {
    HttpResponse::Ok().json(StructureType::all())
}

/// `GET /visual`
pub async fn visual_analyses() -> HttpResponse {
    HttpResponse::Ok().json(VisualAnalysis::all())
}

/// `POST /map_data`
///
/// Accepts a multipart form with an `image` file and a `data` text field
/// holding the annotation JSON. The annotation is validated before
/// anything is written; on success it is echoed back.
pub async fn map_data(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let submission = form::read_submission(payload, state.max_upload_bytes)
        .await
        .inspect_err(|e| log::warn!("Rejected submission: {e}"))?;

    let data = submission
        .data
        .ok_or(ApiError::MissingField(DATA_FIELD))
        .inspect_err(|e| log::warn!("Rejected submission: {e}"))?;

    let annotation = Annotation::from_json(&data).map_err(|e| {
        log::warn!("Rejected submission: {e}");
        ApiError::from(e)
    })?;

    let image = submission
        .image
        .ok_or(ApiError::MissingField(IMAGE_FIELD))
        .inspect_err(|e| log::warn!("Rejected submission: {e}"))?;

    match ingest(state.store.as_ref(), &annotation, image).await {
        Ok(keys) => {
            log::info!(
                "Accepted annotation from {} for {}: {}, {}",
                annotation.username,
                annotation.building_id,
                keys.json,
                keys.image
            );
            Ok(HttpResponse::Ok().json(&annotation))
        }
        Err(e) if e.is_already_exists() => {
            log::warn!("Duplicate submission: {e}");
            Err(e.into())
        }
        Err(e) => {
            log::error!("Failed to store submission: {e}");
            Err(e.into())
        }
    }
}
