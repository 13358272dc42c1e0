use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use async_graphql::ErrorExtensions;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    TokenInvalid(String),

    #[error("Not enrolled in course '{0}'")]
    NotEnrolled(String),

    #[error("Already enrolled in course '{0}'")]
    AlreadyEnrolled(String),

    #[error("Lesson '{0}' is not part of this course")]
    UnknownLesson(String),

    #[error("Enrollment in course '{0}' is already complete")]
    EnrollmentComplete(String),

    #[error("Quiz attempt limit ({0}) reached")]
    AttemptLimitExceeded(u32),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Temporarily unavailable, retry the request: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidFormat(_) => "INVALID_FORMAT",
            AppError::AuthFailed => "AUTH_FAILED",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::TokenInvalid(_) => "TOKEN_INVALID",
            AppError::NotEnrolled(_) => "NOT_ENROLLED",
            AppError::AlreadyEnrolled(_) => "ALREADY_ENROLLED",
            AppError::UnknownLesson(_) => "UNKNOWN_LESSON",
            AppError::EnrollmentComplete(_) => "ENROLLMENT_COMPLETE",
            AppError::AttemptLimitExceeded(_) => "ATTEMPT_LIMIT_EXCEEDED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Transient(_) => "TRANSIENT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub status: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidFormat(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthFailed
            | AppError::TokenExpired
            | AppError::TokenInvalid(_)
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::NotEnrolled(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::UnknownLesson(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyEnrolled(_)
            | AppError::AlreadyExists(_)
            | AppError::EnrollmentComplete(_)
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AttemptLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.error_code(),
            status: self.status_code().as_u16(),
        })
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(format!("BSON serialization error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::TokenInvalid(err.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::InternalError(format!("Password hashing failed: {}", err))
    }
}

impl From<async_graphql::Error> for AppError {
    fn from(err: async_graphql::Error) -> Self {
        AppError::InternalError(err.message)
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_err, e| {
            e.set("code", self.error_code());
        })
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::InvalidFormat("email".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::AuthFailed.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::AlreadyEnrolled("c1".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::AttemptLimitExceeded(3).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Transient("enrollment".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AppError::NotFound("user".into()).to_string(),
            "Not found: user"
        );
        assert_eq!(
            AppError::AttemptLimitExceeded(3).to_string(),
            "Quiz attempt limit (3) reached"
        );
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(AppError::AuthFailed.error_code(), "AUTH_FAILED");
        assert_eq!(
            AppError::EnrollmentComplete("c1".into()).error_code(),
            "ENROLLMENT_COMPLETE"
        );
    }

    #[test]
    fn test_expired_jwt_maps_to_token_expired() {
        let err = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::ExpiredSignature,
        );
        assert_eq!(AppError::from(err), AppError::TokenExpired);

        let err = jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken);
        assert!(matches!(AppError::from(err), AppError::TokenInvalid(_)));
    }

    #[test]
    fn test_graphql_extension_carries_code() {
        let gql = AppError::NotEnrolled("c1".into()).extend();
        let code = gql
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(async_graphql::Value::from("NOT_ENROLLED")));
    }
}
