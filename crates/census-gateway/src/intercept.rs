//! Request interceptor.
//!
//! Wraps every route: counts the request, opens one `http.request` span, and
//! records request and response metadata on it. The downstream response body
//! is drained into memory and re-emitted unchanged, so the whole response is
//! held in memory for the duration of the call.
//!
//! The span is owned by the middleware future. It closes when that future
//! completes, unwinds, or is dropped mid-flight (client cancellation); fields
//! recorded up to that point are kept.

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use chrono::Local;
use futures_util::StreamExt;
use tracing::{field, Instrument, Span};

use census_core::attrs;
use census_core::error::{CensusError, Result};

use crate::app_state::AppState;
use crate::error::ApiError;

enum DrainError {
    Read(axum::Error),
    TooLarge,
}

/// Concatenate a body's data frames, failing once `limit` bytes are exceeded.
async fn drain(body: Body, limit: usize) -> std::result::Result<Bytes, DrainError> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(DrainError::Read)?;
        if buf.len().saturating_add(chunk.len()) > limit {
            return Err(DrainError::TooLarge);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

fn headers_json(headers: &HeaderMap) -> String {
    attrs::headers_json(
        headers
            .iter()
            .map(|(k, v)| (k.as_str(), String::from_utf8_lossy(v.as_bytes()))),
    )
}

/// Absolute-form targets carry their own scheme and authority; origin-form
/// targets take the `Host` header.
fn request_url(req: &Request) -> String {
    let uri = req.uri();
    let host = match uri.authority() {
        Some(authority) => Some(authority.as_str()),
        None => req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok()),
    };
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    attrs::full_url(uri.scheme_str().unwrap_or("http"), host, path_and_query)
}

fn record_status(span: &Span, status: StatusCode) {
    span.record("http.response_status_code", u64::from(status.as_u16()));
    if status.is_server_error() {
        span.record("otel.status_code", "ERROR");
    }
}

/// Middleware entry, installed with `axum::middleware::from_fn_with_state`.
pub async fn intercept(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.metrics().request_counter.inc();

    let started = Instant::now();
    let url = request_url(&req);
    let span = tracing::info_span!(
        "http.request",
        otel.name = %attrs::span_name(req.method().as_str(), &url),
        otel.status_code = field::Empty,
        http.method = %req.method(),
        http.url = %url,
        http.start_time = %attrs::start_time(&Local::now()),
        http.query_params = field::Empty,
        http.headers = field::Empty,
        http.body = field::Empty,
        http.response_status_code = field::Empty,
        http.response_headers = field::Empty,
        http.response_body = field::Empty,
        http.duration_in_sec = field::Empty,
    );

    let body_limit = state.cfg().service.body_limit();
    match observe(&span, req, next, body_limit, started)
        .instrument(span.clone())
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            let resp = ApiError::from(e).into_response();
            record_status(&span, resp.status());
            span.record("http.duration_in_sec", attrs::duration_secs(started.elapsed()));
            resp
        }
    }
}

async fn observe(
    span: &Span,
    req: Request,
    next: Next,
    body_limit: usize,
    started: Instant,
) -> Result<Response> {
    let query: Vec<(String, String)> = match Query::try_from_uri(req.uri()) {
        Ok(Query(pairs)) => pairs,
        Err(e) => {
            tracing::debug!(error = %e, "query string not decodable");
            Vec::new()
        }
    };
    span.record("http.query_params", attrs::query_params_json(query).as_str());
    span.record("http.headers", headers_json(req.headers()).as_str());

    let req = if attrs::is_fetch_method(req.method().as_str()) {
        req
    } else {
        let (parts, body) = req.into_parts();
        let bytes = drain(body, body_limit).await.map_err(|e| match e {
            DrainError::Read(e) => CensusError::BadRequest(format!("request body read failed: {e}")),
            DrainError::TooLarge => CensusError::PayloadTooLarge,
        })?;
        span.record("http.body", &*attrs::body_text(&bytes));
        Request::from_parts(parts, Body::from(bytes))
    };

    let (parts, body) = next.run(req).await.into_parts();
    let bytes = drain(body, usize::MAX).await.map_err(|e| match e {
        DrainError::Read(e) => CensusError::Internal(format!("response body read failed: {e}")),
        DrainError::TooLarge => CensusError::Internal("response body too large".into()),
    })?;
    let elapsed = started.elapsed();

    record_status(span, parts.status);
    span.record("http.response_headers", headers_json(&parts.headers).as_str());
    span.record("http.response_body", &*attrs::body_text(&bytes));
    span.record("http.duration_in_sec", attrs::duration_secs(elapsed));

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
