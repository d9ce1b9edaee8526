//! HTTP boundary: error dispatch, request helpers, server and client.

pub mod body;
pub mod client;
pub mod errors;
pub mod middleware;
pub mod params;
pub mod server;

pub use body::ValidJson;
pub use client::{ClientError, HttpClient};
pub use errors::{ApiError, ApiResult, ErrorResponse, Field, error_response, send_json, status_code};
pub use middleware::handler_error;
pub use params::Params;
pub use server::{BoundServer, HttpServer, ServerConfig, ServerError};
