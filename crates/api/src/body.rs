//! JSON request bodies.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use svckit_core::{HttpError, HttpResult, Validate};

use crate::errors::ApiError;

/// Decode a JSON body. Malformed input is a bad request.
pub fn read_json<T: DeserializeOwned>(body: &[u8]) -> HttpResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| HttpError::bad_request(format!("bad json format: {e}")))
}

/// Decode a JSON body and run its field validation.
///
/// Validation failures keep their field map, so the error envelope lists the
/// offending fields.
pub fn read_valid_json<T: DeserializeOwned + Validate>(body: &[u8]) -> HttpResult<T> {
    let payload: T = read_json(body)?;
    payload.validate().map_err(HttpError::bad_request)?;
    Ok(payload)
}

/// Extractor for a decoded and validated JSON payload.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| HttpError::bad_request(e.body_text()))?;

        Ok(ValidJson(read_valid_json(&bytes)?))
    }
}
