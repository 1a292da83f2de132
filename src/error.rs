//! HTTP error taxonomy and translation.
//!
//! # Responsibilities
//! - Define the recognized error kinds handlers and pipeline steps may raise
//! - Map each kind to an HTTP status and a short human-readable reason
//! - Render errors as JSON responses without leaking internals
//!
//! # Design Decisions
//! - Reason strings travel in the JSON body (`{"error": "..."}`); HTTP/2
//!   dropped reason phrases, so the body is the contract clients rely on
//! - Internal detail is only exposed when diagnostics mode is enabled

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::DirectoryError;
use crate::session::StoreError;

/// Recognized request-handling failures.
///
/// Handlers may raise any of these directly; the pipeline translates them
/// into responses unmodified and wraps everything unrecognized as `Internal`.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Malformed or incomplete client input. Recoverable by the client.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid session, or a failed login.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the user's roles do not intersect the route's.
    #[error("Permission denied")]
    PermissionDenied,

    /// No route registered for (method, path).
    #[error("Not found")]
    NotFound,

    /// The matched CORS rule does not allow this method.
    #[error("Method {method} not allowed")]
    MethodNotAllowed { method: String },

    /// Session backend unreachable. The client's cookie stays valid for retry.
    #[error("Session store unavailable")]
    StoreUnavailable,

    /// Anything unanticipated. Detail is kept out of production responses.
    #[error("{0}")]
    Internal(String),
}

impl HttpError {
    /// HTTP status for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            // Surfaced with the same status as Unauthorized, distinct reason.
            HttpError::PermissionDenied => StatusCode::UNAUTHORIZED,
            HttpError::NotFound => StatusCode::NOT_FOUND,
            HttpError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            HttpError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing reason string.
    pub fn reason(&self) -> String {
        match self {
            HttpError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Render this error as a response. `expose_internal` switches on the
    /// diagnostic mode that includes `Internal` detail in the body.
    pub(crate) fn into_response_with(self, expose_internal: bool) -> Response {
        let status = self.status();
        let reason = match (&self, expose_internal) {
            (HttpError::Internal(detail), true) => detail.clone(),
            _ => self.reason(),
        };
        (status, axum::Json(serde_json::json!({ "error": reason }))).into_response()
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) => HttpError::StoreUnavailable,
        }
    }
}

impl From<DirectoryError> for HttpError {
    fn from(err: DirectoryError) -> Self {
        HttpError::Internal(err.to_string())
    }
}
