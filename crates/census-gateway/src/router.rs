//! Axum router wiring.
//!
//! Ops routes (`/healthz`, `/readyz`, `/metrics`) are merged into the
//! application routes, and the interceptor is layered outermost so every
//! request, including ops, unknown paths and panicking handlers, is counted
//! and traced exactly once.

use axum::{
    middleware,
    routing::{any, get},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{app_state::AppState, intercept, ops};

/// Stock application routes.
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/echo", any(ops::echo))
        .route("/echo/*rest", any(ops::echo))
}

pub fn build_router(state: AppState) -> Router {
    instrument(app_routes(), state)
}

/// Add ops routes to `routes` and wrap everything with the interceptor.
pub fn instrument(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .fallback(ops::not_found)
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            intercept::intercept,
        ))
        .with_state(state)
}
