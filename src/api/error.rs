//! HTTP rendering of [`AppError`].

use crate::error::{AppError, ErrorCode};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::ValidationError | ErrorCode::StatementParseError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DuplicateError => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let body = match self {
            AppError::Validation { ref errors } => json!({
                "error": self.to_string(),
                "code": code,
                "errors": errors,
            }),
            AppError::StatementParse(ref errors) => json!({
                "error": self.to_string(),
                "code": code,
                "errors": errors,
            }),
            AppError::Storage(_) | AppError::Internal(_) => {
                log::error!("{}", self);
                json!({ "error": "Internal server error", "code": code })
            }
            _ => json!({ "error": self.to_string(), "code": code }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let (status, body) = body_of(AppError::invalid("name", "Name is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["errors"]["name"][0], "Name is required");
    }

    #[tokio::test]
    async fn test_not_found_and_duplicate_status() {
        let (status, body) = body_of(AppError::not_found("Bucket")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Bucket not found");
        assert!(body.get("errors").is_none());

        let (status, body) = body_of(AppError::Duplicate).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "DUPLICATE_ERROR");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_of(AppError::Internal("disk on fire".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
    }
}
