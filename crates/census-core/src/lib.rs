//! census core: transport-agnostic error types and span attribute formatting.
//!
//! This crate defines the error surface shared by the gateway and the pure
//! helpers that turn request/response metadata into span attribute text. It
//! carries no HTTP or runtime dependencies so the formatting rules can be
//! tested in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `CensusError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod attrs;
pub mod error;

pub use error::{CensusError, Result};
