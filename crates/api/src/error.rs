use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::errors::{FormError, Violations};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request that is not tied to a particular field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Field-level violations, reported all at once.
    #[error("Validation error: {0}")]
    InvalidFields(Violations),

    /// The schema was already soft-deleted.
    #[error("Already deleted: {0}")]
    AlreadyDeleted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
            ApiError::InvalidFields(violations) => {
                let message = violations.to_string();
                let details = violations
                    .into_iter()
                    .map(|v| ValidationDetail {
                        field: v.field,
                        message: v.message,
                    })
                    .collect();
                (StatusCode::BAD_REQUEST, "validation_error", message, Some(details))
            }
            ApiError::AlreadyDeleted(msg) => {
                (StatusCode::BAD_REQUEST, "already_deleted", msg, None)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<FormError> for ApiError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::Validation(violations) => ApiError::InvalidFields(violations),
            FormError::NotFound(msg) => ApiError::NotFound(msg),
            FormError::PermissionDenied(msg) => ApiError::Forbidden(msg),
            FormError::AlreadyDeleted(msg) => ApiError::AlreadyDeleted(msg),
            FormError::Storage(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::errors::ViolationCode;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_api_error_unauthorized() {
        let response = ApiError::Unauthorized("test message".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_api_error_forbidden() {
        let response = ApiError::Forbidden("access denied".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_api_error_not_found() {
        let response = ApiError::NotFound("resource not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_api_error_internal() {
        let response = ApiError::Internal("database connection failed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let response = ApiError::Internal("password=hunter2".to_string()).into_response();
        let json = body_json(response).await;
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_invalid_fields_lists_details() {
        let mut violations = Violations::new();
        violations.push("email", ViolationCode::RequiredFieldMissing, "'email' is required");
        violations.push("phone", ViolationCode::RequiredFieldMissing, "'phone' is required");

        let response = ApiError::InvalidFields(violations).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "2 validation errors");
        assert_eq!(json["details"][0]["field"], "email");
        assert_eq!(json["details"][1]["field"], "phone");
    }

    #[tokio::test]
    async fn test_plain_validation_has_no_details() {
        let json = body_json(ApiError::Validation("bad".to_string()).into_response()).await;
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_form_error_mapping() {
        let cases = [
            (FormError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (FormError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (FormError::AlreadyDeleted("x".into()), StatusCode::BAD_REQUEST),
            (FormError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (FormError::Validation(Violations::new()), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            format!("{}", ApiError::Unauthorized("test".to_string())),
            "Unauthorized: test"
        );
        assert_eq!(
            format!("{}", ApiError::AlreadyDeleted("test".to_string())),
            "Already deleted: test"
        );
    }
}
