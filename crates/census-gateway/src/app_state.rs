//! Shared application state for the census service.
//!
//! Holds the config, the metrics registry and the host probe. Handlers and
//! the interceptor receive it through axum `State`; nothing lives in
//! module-level globals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use census_core::error::Result;

use crate::config::ServiceConfig;
use crate::obs::host::{HostProbe, SysinfoProbe};
use crate::obs::metrics::ServiceMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    metrics: ServiceMetrics,
    probe: Arc<dyn HostProbe>,
    draining: AtomicBool,
}

impl AppState {
    /// Build application state with the sysinfo-backed probe.
    pub fn new(cfg: ServiceConfig) -> Result<Self> {
        let probe = Arc::new(SysinfoProbe::new(cfg.service.storage_mount.clone()));
        Self::with_probe(cfg, probe)
    }

    /// Build application state around a caller-provided probe.
    pub fn with_probe(cfg: ServiceConfig, probe: Arc<dyn HostProbe>) -> Result<Self> {
        let metrics = ServiceMetrics::new()?;
        if cfg.telemetry.process_metrics {
            metrics.register_process_collector()?;
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics,
                probe,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.inner.metrics
    }

    pub fn probe(&self) -> Arc<dyn HostProbe> {
        Arc::clone(&self.inner.probe)
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
