//! HTTP error envelope.
//!
//! Every failure renders as `{"error": {"code", "message"}}` with a status
//! derived from the store error kind.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use habitkeep_core::{InvalidIdError, StoreError};
use log::error;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error",
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        let status = match value {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::CorruptState(_) | StoreError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: value.code(),
            message: value.to_string(),
        }
    }
}

impl From<InvalidIdError> for ApiError {
    fn from(value: InvalidIdError) -> Self {
        Self::from(StoreError::Validation(value.into()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::bad_request("invalid_body", value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::bad_request("invalid_query", value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                "event=http_error module=http status={} error_code={} error={}",
                self.status.as_u16(),
                self.code,
                self.message
            );
        }
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use habitkeep_core::{
        EntityRef, HabitId, PersistError, ProofId, StoreError, ValidationError,
    };

    #[test]
    fn store_errors_map_to_statuses() {
        let validation = ApiError::from(StoreError::Validation(ValidationError::EmptyName));
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.code, "validation_failed");

        let missing = ApiError::from(StoreError::NotFound(EntityRef::Habit(HabitId::from_seq(3))));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.message, "habit h3 not found");

        let disk = ApiError::from(StoreError::Persistence(PersistError::Io(
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        )));
        assert_eq!(disk.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(disk.code, "persistence_failed");

        let corrupt = ApiError::from(StoreError::CorruptState("bad".to_string()));
        assert_eq!(corrupt.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn malformed_ids_are_validation_failures() {
        let err = "x9".parse::<ProofId>().unwrap_err();
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "validation_failed");
        assert!(api.message.contains("x9"));
    }
}
