use axum::{http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use tracing::error;

use crate::model::quote_status::{QuoteStatus, TransitionError};
use crate::repository::repository_error::RepositoryError;

#[derive(Debug, Serialize)]
pub enum HandlerErrorKind {
    NotFound,
    Validation,
    Internal,
    Unauthorized,
    Forbidden,
    Conflict,
    PreconditionFailed,
    BadRequest,
}

impl std::fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandlerErrorKind::NotFound => "NotFound",
            HandlerErrorKind::Validation => "Validation",
            HandlerErrorKind::Internal => "Internal",
            HandlerErrorKind::Unauthorized => "Unauthorized",
            HandlerErrorKind::Forbidden => "Forbidden",
            HandlerErrorKind::Conflict => "Conflict",
            HandlerErrorKind::PreconditionFailed => "PreconditionFailed",
            HandlerErrorKind::BadRequest => "BadRequest",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Serialize)]
pub struct HandlerError {
    pub error: HandlerErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl HandlerError {
    pub fn new(error: HandlerErrorKind, message: impl Into<String>) -> Self {
        HandlerError {
            error,
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::Forbidden, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::BadRequest, message)
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HandlerError {}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match self.error {
            HandlerErrorKind::NotFound => StatusCode::NOT_FOUND,
            HandlerErrorKind::Validation | HandlerErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            HandlerErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            HandlerErrorKind::Forbidden => StatusCode::FORBIDDEN,
            HandlerErrorKind::Conflict | HandlerErrorKind::PreconditionFailed => StatusCode::CONFLICT,
            HandlerErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(self);
        (status, body).into_response()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Not Authorized: {0}")]
    NotAuthorized(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The quote is not in a state that allows the requested change.
    #[error("Precondition Failed: {message}")]
    PreconditionFailed { current: QuoteStatus, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::ValidationError(msg) => ServiceError::InvalidInput(msg),
            RepositoryError::AlreadyExists(msg) | RepositoryError::VersionConflict(msg) => {
                ServiceError::Conflict(msg)
            }
            RepositoryError::DatabaseError(msg)
            | RepositoryError::ConnectionError(msg)
            | RepositoryError::SerializationError(msg) => ServiceError::InternalError(msg),
            RepositoryError::Generic(e) => ServiceError::InternalError(e.to_string()),
        }
    }
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        ServiceError::PreconditionFailed {
            current: err.current,
            message: err.to_string(),
        }
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => HandlerError::new(HandlerErrorKind::Validation, message),
            ServiceError::NotFound(message) => HandlerError::new(HandlerErrorKind::NotFound, message),
            ServiceError::NotAuthorized(message) => HandlerError::new(HandlerErrorKind::Forbidden, message),
            ServiceError::Unauthenticated(message) => HandlerError::new(HandlerErrorKind::Unauthorized, message),
            ServiceError::PreconditionFailed { current, message } => HandlerError {
                error: HandlerErrorKind::PreconditionFailed,
                message,
                details: Some(current.to_string()),
            },
            ServiceError::Conflict(message) => HandlerError::new(HandlerErrorKind::Conflict, message),
            ServiceError::InternalError(message) => {
                error!("Internal error: {}", message);
                HandlerError::new(HandlerErrorKind::Internal, "Internal server error")
            }
        }
    }
}

impl From<validator::ValidationErrors> for HandlerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        HandlerError {
            error: HandlerErrorKind::Validation,
            message: "Request validation failed".to_string(),
            details: Some(errors.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_failure_carries_current_status() {
        let err = ServiceError::PreconditionFailed {
            current: QuoteStatus::Pending,
            message: "quote must be quoted".to_string(),
        };
        let handler_error = HandlerError::from(err);
        assert!(matches!(handler_error.error, HandlerErrorKind::PreconditionFailed));
        assert_eq!(handler_error.details.as_deref(), Some("pending"));
        assert_eq!(handler_error.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_error_message_is_not_leaked() {
        let handler_error = HandlerError::from(ServiceError::InternalError("socket closed".to_string()));
        assert_eq!(handler_error.message, "Internal server error");
    }

    #[test]
    fn version_conflict_maps_to_conflict() {
        let err = ServiceError::from(RepositoryError::version_conflict("stale"));
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
