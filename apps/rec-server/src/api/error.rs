//! Maps [`RecError`] onto an HTTP response: status from
//! `ErrorCategory::http_status`, body `{ code, message }` (spec §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rec_protocol::RecError;
use serde_json::json;

pub struct ApiError(pub RecError);

impl From<RecError> for ApiError {
    fn from(err: RecError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.category.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({ "code": self.0.wire_code(), "message": self.0.message }));
        (status, body).into_response()
    }
}
