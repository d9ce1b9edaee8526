use std::future::Future;
use std::pin::Pin;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::errors::ApiError;

/// Boxed response future returned by [`handler_error`].
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Adapt a fallible handler into an axum handler.
///
/// On success the handler's own response is returned untouched. On failure
/// the error is dispatched to a status code, logged, and rendered as the JSON
/// error envelope: exactly one response per request, no retries.
///
/// ```ignore
/// Router::new().route("/orders/:id", get(handler_error(find_order)))
/// ```
pub fn handler_error<H, Fut, E>(
    handler: H,
) -> impl Fn(Request) -> ResponseFuture + Clone + Send + Sync + 'static
where
    H: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: Into<ApiError>,
{
    move |req: Request| {
        let handler = handler.clone();
        let span = tracing::info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
        );

        let fut: ResponseFuture = Box::pin(
            async move {
                match handler(req).await {
                    Ok(resp) => resp,
                    Err(err) => Into::<ApiError>::into(err).into_response(),
                }
            }
            .instrument(span),
        );
        fut
    }
}
