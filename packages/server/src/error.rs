//! HTTP error mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use building_survey_annotation::IngestError;
use building_survey_annotation_models::ValidationError;
use building_survey_server_models::ApiErrorBody;

/// Errors a request handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body could not be read as `multipart/form-data`.
    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    /// A required form field was not sent.
    #[error("Missing required form field `{0}`")]
    MissingField(&'static str),

    /// A form field exceeded its size limit.
    #[error("Form field `{field}` exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Field name.
        field: &'static str,
        /// Limit in bytes.
        limit: usize,
    },

    /// The annotation JSON was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Persisting the submission failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::MissingField(_) | Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Ingest(e) if e.is_already_exists() => StatusCode::PRECONDITION_FAILED,
            Self::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error = if status.is_server_error() {
            "Failed to store submission".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ApiErrorBody { error })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::MessageBody as _;
    use building_survey_storage::StorageError;

    use super::*;

    fn body_of(err: &ApiError) -> ApiErrorBody {
        let bytes = err.error_response().into_body().try_into_bytes().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = ApiError::MissingField("image");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_of(&err).error, "Missing required form field `image`");

        let err = ApiError::PayloadTooLarge {
            field: "image",
            limit: 10,
        };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let err = ApiError::Multipart("boundary missing".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn existing_object_is_a_precondition_failure() {
        let err = ApiError::from(IngestError::from(StorageError::AlreadyExists {
            bucket: "surveys".to_string(),
            key: "json/a.json".to_string(),
        }));
        assert_eq!(err.status_code(), StatusCode::PRECONDITION_FAILED);
        assert!(body_of(&err).error.contains("json/a.json"));
    }

    #[test]
    fn server_errors_hide_details() {
        let err = ApiError::from(IngestError::from(StorageError::Put {
            bucket: "surveys".to_string(),
            key: "json/a.json".to_string(),
            source: "secret endpoint detail".into(),
        }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(&err).error, "Failed to store submission");
    }
}
