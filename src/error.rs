// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::service::AuthError;
use crate::database::manager::DatabaseError;
use crate::labels::service::LabelError;
use crate::labels::validator::ValidationError;
use crate::notes::service::NoteError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.into(), message.clone());
        ApiError::ValidationError {
            message,
            field_errors: Some(field_errors),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert domain error types to ApiError
impl From<LabelError> for ApiError {
    fn from(err: LabelError) -> Self {
        match err {
            LabelError::Unauthenticated => ApiError::unauthorized("Authentication required"),
            LabelError::Forbidden => {
                ApiError::forbidden("Only the owner of a label may access it")
            }
            LabelError::NotFound => ApiError::not_found("Label not found"),
            LabelError::Validation(e) => e.into(),
            LabelError::Storage(e) => {
                // Don't expose internal storage errors to clients
                tracing::error!("Label storage error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::field_error("title", err.to_string())
    }
}

impl From<NoteError> for ApiError {
    fn from(err: NoteError) -> Self {
        match err {
            NoteError::Unauthenticated => ApiError::unauthorized("Authentication required"),
            NoteError::Forbidden => ApiError::forbidden("Only the author of a note may access it"),
            NoteError::NotFound => ApiError::not_found("Note not found"),
            NoteError::EmptyText => ApiError::field_error("text", "Text must not be empty"),
            NoteError::UnknownLabel => {
                ApiError::field_error("labels", "Referenced label does not exist")
            }
            NoteError::Storage(e) => {
                tracing::error!("Note storage error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid credentials"),
            AuthError::Unauthenticated => ApiError::unauthorized("Authentication required"),
            AuthError::AlreadyActive => ApiError::forbidden("Account is already active"),
            AuthError::Validation { field, message } => ApiError::field_error(field, message),
            AuthError::Hashing => {
                tracing::error!("Password hashing failed");
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AuthError::Jwt(e) => {
                tracing::error!("JWT error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AuthError::Storage(e) => {
                tracing::error!("User storage error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(e) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", e);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_title_maps_to_field_level_validation_error() {
        let api: ApiError = LabelError::Validation(ValidationError::DuplicateTitle).into();
        assert_eq!(api.status_code(), 400);

        let body = api.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["title"].is_string());
    }

    #[test]
    fn access_denials_have_distinct_codes() {
        let unauth: ApiError = LabelError::Unauthenticated.into();
        let forbidden: ApiError = LabelError::Forbidden.into();
        assert_eq!(unauth.status_code(), 401);
        assert_eq!(forbidden.status_code(), 403);
        assert_ne!(unauth.error_code(), forbidden.error_code());
    }

    #[test]
    fn not_found_is_distinct_from_denials() {
        let api: ApiError = LabelError::NotFound.into();
        assert_eq!(api.status_code(), 404);
    }
}
