//! Tracing subscriber setup.
//!
//! Request spans are plain `tracing` spans. The fmt layer prints them locally;
//! with `span_events` on, every closed span is printed with its fields. When
//! `telemetry.otlp` is set, an OpenTelemetry layer also exports them, named by
//! their `otel.name` field and flagged by `otel.status_code`.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use census_core::error::{CensusError, Result};

use crate::config::{LogFormat, OtlpSection, TelemetrySection};

const TRACER_NAME: &str = "census";

/// Flushes and shuts down the span exporter when dropped.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "span exporter shutdown failed");
            }
        }
    }
}

/// OpenTelemetry bridge over `provider`.
pub fn otel_layer<S>(provider: &SdkTracerProvider) -> OpenTelemetryLayer<S, SdkTracer>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME))
}

/// Batch OTLP/HTTP exporter for `cfg.endpoint`.
pub fn otlp_provider(cfg: &OtlpSection) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(cfg.endpoint.clone())
        .build()
        .map_err(|e| CensusError::Internal(format!("otlp exporter init failed: {e}")))?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(cfg.service_name.clone())
                .build(),
        )
        .build())
}

pub fn init(cfg: &TelemetrySection) -> Result<TelemetryGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let span_events = if cfg.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let provider = cfg.otlp.as_ref().map(otlp_provider).transpose()?;
    let otel = provider.as_ref().map(|p| otel_layer(p));

    let registry = tracing_subscriber::registry().with(filter).with(otel);
    let res = match cfg.log_format {
        LogFormat::Text => registry
            .with(fmt::layer().with_span_events(span_events))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_span_events(span_events))
            .try_init(),
    };
    res.map_err(|e| CensusError::Internal(format!("tracing init failed: {e}")))?;

    if let Some(otlp) = &cfg.otlp {
        tracing::info!(endpoint = %otlp.endpoint, "exporting spans over otlp");
    }
    Ok(TelemetryGuard { provider })
}
