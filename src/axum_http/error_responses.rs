use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Error body shared by every route: a terse message plus the request
/// correlation id, with diagnostic detail only under the debug opt-in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    request_id: &str,
    detail: Option<String>,
) -> Response {
    let body = ErrorBody {
        error: message.into(),
        request_id: request_id.to_string(),
        detail,
    };

    (status, Json(body)).into_response()
}
