//! Observability plumbing.
//!
//! - `metrics`: the Prometheus registry (request counter + host gauges)
//! - `host`: host resource sampling behind the `HostProbe` seam
//! - `telemetry`: tracing subscriber setup; request spans are emitted through it

pub mod host;
pub mod metrics;
pub mod telemetry;
