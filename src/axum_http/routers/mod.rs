pub mod billing;
pub mod expenses;
pub mod mileage;
pub mod settings;

use axum::{
    http::{HeaderMap, HeaderValue},
    response::Response,
};

pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

/// Success/cancel/return URLs are built from the caller's own origin so
/// the same deployment serves every environment; server-to-server calls
/// carry no Origin header and fall back to the configured base URL.
pub(crate) fn request_origin(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(axum::http::header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(|| fallback.trim_end_matches('/').to_string())
}

/// Stamps the correlation id onto the response so success and error
/// paths alike can be tied back to the log stream.
pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
