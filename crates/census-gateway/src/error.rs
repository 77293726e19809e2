//! HTTP mapping for `CensusError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use census_core::error::{CensusError, ClientCode};

/// `CensusError` as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub CensusError);

impl From<CensusError> for ApiError {
    fn from(e: CensusError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest => StatusCode::BAD_REQUEST,
            ClientCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ClientCode::SamplingFailed | ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
