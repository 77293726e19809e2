//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 when draining)
//! - `/metrics` : host gauges sampled on demand, then the Prometheus text format
//! - `/echo`    : returns the request body, handy for exercising the interceptor

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use census_core::error::CensusError;

use crate::app_state::AppState;
use crate::error::ApiError;

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let probe = state.probe();
    let sample = tokio::task::spawn_blocking(move || probe.sample())
        .await
        .map_err(|e| CensusError::Internal(format!("sampling task failed: {e}")))??;

    state.metrics().record_host(&sample);
    let body = state.metrics().render()?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
        body,
    )
        .into_response())
}

pub async fn echo(headers: HeaderMap, body: Bytes) -> Response {
    let mut resp = (StatusCode::OK, body).into_response();
    if let Some(ct) = headers.get(header::CONTENT_TYPE) {
        resp.headers_mut().insert(header::CONTENT_TYPE, ct.clone());
    }
    resp
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
