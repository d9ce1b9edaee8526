//! Error dispatch and the JSON error envelope.
//!
//! - [`status_code`] picks the HTTP status for an arbitrary error.
//! - [`ErrorResponse`] is the wire envelope.
//! - [`send_json`] writes a JSON payload with a status.
//! - [`ApiError`] ties them together as an axum response.

use std::error::Error as StdError;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use svckit_core::{BoxError, HttpError, Kind};

/// Map an error to its HTTP status.
///
/// Only [`HttpError`] values are recognised. Capabilities are checked in a
/// fixed order (bad request, not found, unauthorized, not acceptable);
/// everything else is a 500. Conflict and Forbidden errors are not part of
/// that list and therefore also map to 500.
pub fn status_code(err: &(dyn StdError + 'static)) -> StatusCode {
    let Some(err) = err.downcast_ref::<HttpError>() else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };

    if err.is_bad_request() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_unauthorized() {
        StatusCode::UNAUTHORIZED
    } else if err.is_not_acceptable() {
        StatusCode::NOT_ACCEPTABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// JSON error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub message: String,
}

impl ErrorResponse {
    /// Build the envelope for `err`, already dispatched to `status`.
    ///
    /// `fields` is only filled for 400 responses whose error carries
    /// field-level detail.
    pub fn from_error(
        status: StatusCode,
        err: &(dyn StdError + 'static),
        timestamp: DateTime<Utc>,
    ) -> Self {
        let http_err = err.downcast_ref::<HttpError>();

        let message = match http_err.and_then(HttpError::custom_message) {
            Some(custom) => custom.to_string(),
            None => err.to_string(),
        };

        let fields = match http_err {
            Some(e) if status == StatusCode::BAD_REQUEST => e
                .fields()
                .iter()
                .map(|(name, message)| Field {
                    name: name.to_string(),
                    message: message.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            timestamp,
            message,
            fields,
        }
    }
}

/// The payload could not be serialised; the response degrades to a bare 500.
#[derive(Debug, Error)]
#[error("failed to encode response body: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

impl IntoResponse for EncodeError {
    fn into_response(self) -> Response {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// Serialise `payload` as the JSON body of a `status` response.
pub fn send_json<T: Serialize + ?Sized>(
    status: StatusCode,
    payload: &T,
) -> Result<Response, EncodeError> {
    let body = serde_json::to_vec(payload)?;
    Ok((
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response())
}

/// Dispatch `err`, log it, and render its envelope.
pub fn error_response(err: &(dyn StdError + 'static)) -> Response {
    let status = status_code(err);

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %err, "request failed");
    } else {
        tracing::warn!(status = status.as_u16(), error = %err, "request failed");
    }

    let envelope = ErrorResponse::from_error(status, err, Utc::now());
    match send_json(status, &envelope) {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, "error envelope encoding failed");
            e.into_response()
        }
    }
}

/// Any error returned from a handler.
///
/// Handlers return `Result<T, ApiError>` and use `?` on [`HttpError`] or any
/// other error type; the response is produced by [`error_response`].
#[derive(Debug)]
pub struct ApiError(BoxError);

impl ApiError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }

    pub fn status(&self) -> StatusCode {
        status_code(self.0.as_ref())
    }

    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }

    pub fn kind(&self) -> Option<Kind> {
        self.0.downcast_ref::<HttpError>().map(HttpError::kind)
    }
}

impl<E> From<E> for ApiError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self(Box::new(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.0.as_ref())
    }
}

/// Convenience type alias for route handler results.
pub type ApiResult<T> = Result<T, ApiError>;
