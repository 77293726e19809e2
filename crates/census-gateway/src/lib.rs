//! census gateway library entry.
//!
//! This crate wires config, shared state, the metrics registry, host sampling
//! and the request interceptor into an axum service. It is intended to be
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod intercept;
pub mod obs;
pub mod ops;
pub mod router;
