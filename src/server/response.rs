use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;
use tracing::warn;

use crate::types::LedgerError;

const GENERIC_FAILURE: &str = "Internal server error.";

impl LedgerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Parse(_) | Self::Decode { .. } => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.is_opaque() {
            error!("request failed: {self}");
            GENERIC_FAILURE.to_owned()
        }
        else {
            warn!(%status, "request rejected: {self}");
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for LedgerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for LedgerError {
    fn from(err: MultipartError) -> Self {
        Self::Validation(format!("Malformed upload: {}", err.body_text()))
    }
}

/// A success body: `{"success": true, ...payload}`.
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    payload: T,
}

impl<T: Serialize> Success<T> {
    pub fn new(payload: T) -> Self {
        Self { success: true, payload }
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
