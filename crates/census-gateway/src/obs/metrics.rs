//! Metrics registry for the service.
//!
//! One `prometheus::Registry` per `ServiceMetrics`, shared through `AppState`
//! instead of process-wide statics, so tests can build isolated instances.
//! Counter and gauges are atomics inside the `prometheus` crate; concurrent
//! `inc`/`set` need no extra locking.

use prometheus::{Encoder, Gauge, IntCounter, Opts, Registry, TextEncoder};

use census_core::error::{CensusError, Result};

use crate::obs::host::HostSample;

fn encode_err(e: prometheus::Error) -> CensusError {
    CensusError::Encode(e.to_string())
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge> {
    let g = Gauge::with_opts(Opts::new(name, help)).map_err(encode_err)?;
    registry.register(Box::new(g.clone())).map_err(encode_err)?;
    Ok(g)
}

pub struct ServiceMetrics {
    registry: Registry,
    pub request_counter: IntCounter,
    pub cpu_usage: Gauge,
    pub ram_usage: Gauge,
    pub storage_usage: Gauge,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let request_counter = IntCounter::with_opts(Opts::new(
            "request_counter",
            "Counts number of requests accepted",
        ))
        .map_err(encode_err)?;
        registry
            .register(Box::new(request_counter.clone()))
            .map_err(encode_err)?;

        let cpu_usage = gauge(&registry, "cpu_usage", "Get current cpu usage")?;
        let ram_usage = gauge(&registry, "ram_usage", "Get current ram usage")?;
        let storage_usage = gauge(&registry, "storage_usage", "Get current storage usage")?;

        Ok(Self {
            registry,
            request_counter,
            cpu_usage,
            ram_usage,
            storage_usage,
        })
    }

    /// Add the standard `process_*` metrics of the running process.
    /// No-op outside Linux.
    pub fn register_process_collector(&self) -> Result<()> {
        #[cfg(target_os = "linux")]
        {
            let pc = prometheus::process_collector::ProcessCollector::for_self();
            self.registry.register(Box::new(pc)).map_err(encode_err)?;
        }
        Ok(())
    }

    /// Overwrite the host gauges with one sample.
    pub fn record_host(&self, sample: &HostSample) {
        self.cpu_usage.set(sample.cpu_percent);
        self.ram_usage.set(sample.ram_percent);
        self.storage_usage.set(sample.storage_percent);
    }

    /// Render the whole registry in Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(encode_err)?;
        String::from_utf8(buf).map_err(|e| CensusError::Encode(e.to_string()))
    }
}
