//! Shared test fixtures: span capture, fixed host probes, request helpers.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    http::Request,
    response::Response,
};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use census_core::error::{CensusError, Result};
use census_gateway::app_state::AppState;
use census_gateway::config::ServiceConfig;
use census_gateway::obs::host::{HostProbe, HostSample};

// --------------------
// Span capture
// --------------------
#[derive(Debug, Clone, Default)]
pub struct SpanRecord {
    pub fields: BTreeMap<String, String>,
}

impl SpanRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn status(&self) -> Option<u16> {
        self.get("http.response_status_code").and_then(|s| s.parse().ok())
    }
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Collects every `http.request` span once it closes.
#[derive(Clone, Default)]
pub struct SpanCapture {
    opened: Arc<AtomicUsize>,
    closed: Arc<Mutex<Vec<SpanRecord>>>,
}

impl SpanCapture {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> Vec<SpanRecord> {
        self.closed.lock().unwrap().clone()
    }

    /// Install as the thread-local subscriber for the rest of the scope.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        use tracing_subscriber::layer::SubscriberExt;
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }
}

impl<S> Layer<S> for SpanCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if attrs.metadata().name() != "http.request" {
            return;
        }
        let mut rec = SpanRecord::default();
        attrs.record(&mut FieldVisitor(&mut rec.fields));
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(rec);
            self.opened.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(rec) = span.extensions_mut().get_mut::<SpanRecord>() {
                values.record(&mut FieldVisitor(&mut rec.fields));
            }
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(&id) {
            if let Some(rec) = span.extensions_mut().remove::<SpanRecord>() {
                self.closed.lock().unwrap().push(rec);
            }
        }
    }
}

// --------------------
// Probes
// --------------------
pub struct FixedProbe(pub HostSample);

impl HostProbe for FixedProbe {
    fn sample(&self) -> Result<HostSample> {
        Ok(self.0)
    }
}

pub struct FailingProbe;

impl HostProbe for FailingProbe {
    fn sample(&self) -> Result<HostSample> {
        Err(CensusError::Sampling("no disk mounted at /".into()))
    }
}

pub fn fixed_probe() -> Arc<dyn HostProbe> {
    Arc::new(FixedProbe(HostSample {
        cpu_percent: 12.5,
        ram_percent: 40.0,
        storage_percent: 73.25,
    }))
}

pub fn test_cfg() -> ServiceConfig {
    let mut cfg = ServiceConfig::default();
    cfg.telemetry.process_metrics = false;
    cfg
}

pub fn test_state() -> AppState {
    AppState::with_probe(test_cfg(), fixed_probe()).unwrap()
}

// --------------------
// Requests
// --------------------
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("host", "localhost")
        .body(Body::empty())
        .unwrap()
}

pub fn with_body(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "localhost")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub async fn body_bytes(resp: Response) -> Bytes {
    axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap()
}

/// Value of an unlabelled metric in exposition text.
pub fn metric_value(text: &str, name: &str) -> f64 {
    text.lines()
        .filter(|l| !l.starts_with('#'))
        .find_map(|l| l.strip_prefix(name).and_then(|rest| rest.strip_prefix(' ')))
        .map(|v| v.trim().parse().unwrap())
        .unwrap_or_else(|| panic!("metric {name} missing in:\n{text}"))
}
