//! Outbound JSON HTTP client.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Thin wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` and decode the JSON response.
    pub async fn get<R: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<R, ClientError> {
        let req = with_headers(self.client.get(url), headers);
        tracing::debug!(method = "GET", url, "outbound request");

        decode(req.send().await?).await
    }

    /// POST `body` as JSON and hand back the raw response.
    ///
    /// The status is not checked; callers decide what a non-2xx means.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<Response, ClientError> {
        let payload = serde_json::to_vec(body)?;
        tracing::debug!(
            method = "POST",
            url,
            body = %String::from_utf8_lossy(&payload),
            "outbound request"
        );

        let req = with_headers(self.client.post(url), headers)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);
        let resp = req.send().await?;

        tracing::debug!(url, status = resp.status().as_u16(), "outbound response");
        Ok(resp)
    }

    /// POST `form` as `application/x-www-form-urlencoded` and decode the JSON
    /// response.
    pub async fn post_form<R: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<R, ClientError> {
        tracing::debug!(method = "POST", url, fields = form.len(), "outbound form request");

        decode(self.client.post(url).form(form).send().await?).await
    }
}

fn with_headers(mut req: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    req
}

async fn decode<R: DeserializeOwned>(resp: Response) -> Result<R, ClientError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    tracing::debug!(status = status.as_u16(), bytes = body.len(), "outbound response");

    if !status.is_success() {
        return Err(ClientError::Status {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    Ok(serde_json::from_slice(&body)?)
}
