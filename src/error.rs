//! Error taxonomy shared by the auth core and the HTTP layer.
//!
//! Every auth operation resolves to either a success payload or exactly one
//! [`AppError`]. The [`ErrorKind`] carries the domain meaning; the wire status is
//! derived from it through [`ErrorKind::status`], never stored alongside it.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Authorization,
    NotFound,
    Conflict,
    PayloadTooLarge,
    UnsupportedMediaType,
    Internal,
    ServiceUnavailable,
}

impl ErrorKind {
    /// Transport status for each category.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Authorization => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// A single field-level validation failure.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Wire shape of every non-2xx response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    errors: Vec<FieldError>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn bad_request(reason: impl std::fmt::Display, errors: Vec<FieldError>) -> Self {
        Self {
            kind: ErrorKind::BadRequest,
            message: format!("Bad request. Reason: {reason}"),
            errors,
        }
    }

    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, reason)
    }

    pub fn conflict(field: &str, value: &str) -> Self {
        Self::new(
            ErrorKind::Conflict,
            format!("resource: {field} with value: {value} already exists"),
        )
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal, "Internal server error.")
    }

    #[must_use]
    pub fn service_unavailable() -> Self {
        Self::new(ErrorKind::ServiceUnavailable, "Service unavailable.")
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.status().as_u16(),
            message: self.message.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => Self::new(
                ErrorKind::UnsupportedMediaType,
                "Expected request with `Content-Type: application/json`",
            ),
            JsonRejection::BytesRejection(err)
                if err.status() == StatusCode::PAYLOAD_TOO_LARGE =>
            {
                Self::new(ErrorKind::PayloadTooLarge, "Request body is too large")
            }
            other => Self::bad_request(other.body_text(), Vec::new()),
        }
    }
}
