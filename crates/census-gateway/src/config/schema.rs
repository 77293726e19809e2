use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;
use census_core::error::{CensusError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            service: ServiceSection::default(),
            telemetry: TelemetrySection::default(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(CensusError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.service.validate()?;
        if let Some(otlp) = &self.telemetry.otlp {
            otlp.validate()?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Mount point whose usage feeds `storage_usage`.
    #[serde(default = "default_storage_mount")]
    pub storage_mount: String,

    /// Upper bound for buffered request bodies. Unset means unbounded.
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            storage_mount: default_storage_mount(),
            max_body_bytes: None,
        }
    }
}

impl ServiceSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !Path::new(&self.storage_mount).is_absolute() {
            return Err(CensusError::Config(
                "service.storage_mount must be an absolute path".into(),
            ));
        }
        if self.max_body_bytes == Some(0) {
            return Err(CensusError::Config(
                "service.max_body_bytes must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            CensusError::Config(format!(
                "service.listen must be a valid SocketAddr: {}",
                self.listen
            ))
        })
    }

    pub fn body_limit(&self) -> usize {
        self.max_body_bytes.unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    #[serde(default)]
    pub log_format: LogFormat,

    /// Print closed spans with their fields.
    #[serde(default = "default_true")]
    pub span_events: bool,

    /// Register the `process_*` collector (Linux only).
    #[serde(default = "default_true")]
    pub process_metrics: bool,

    /// Export request spans over OTLP. Unset keeps spans local.
    #[serde(default)]
    pub otlp: Option<OtlpSection>,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            span_events: true,
            process_metrics: true,
            otlp: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtlpSection {
    /// OTLP/HTTP traces endpoint, e.g. `http://localhost:4318/v1/traces`.
    pub endpoint: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl OtlpSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(CensusError::Config(format!(
                "telemetry.otlp.endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }
        if self.service_name.trim().is_empty() {
            return Err(CensusError::Config(
                "telemetry.otlp.service_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_storage_mount() -> String {
    "/".into()
}
fn default_true() -> bool {
    true
}
fn default_service_name() -> String {
    "census".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ServiceConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.service.body_limit(), usize::MAX);
        assert!(cfg.telemetry.span_events);
    }

    #[test]
    fn rejects_bad_listen() {
        let mut cfg = ServiceConfig::default();
        cfg.service.listen = "localhost".into();
        assert!(matches!(cfg.validate(), Err(CensusError::Config(_))));
    }

    #[test]
    fn rejects_relative_mount() {
        let mut cfg = ServiceConfig::default();
        cfg.service.storage_mount = "data".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn otlp_endpoint_must_be_http() {
        let mut cfg = ServiceConfig::default();
        cfg.telemetry.otlp = Some(OtlpSection {
            endpoint: "localhost:4318".into(),
            service_name: default_service_name(),
        });
        assert!(matches!(cfg.validate(), Err(CensusError::Config(_))));

        cfg.telemetry.otlp = Some(OtlpSection {
            endpoint: "http://localhost:4318/v1/traces".into(),
            service_name: default_service_name(),
        });
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_body_limit() {
        let mut cfg = ServiceConfig::default();
        cfg.service.max_body_bytes = Some(0);
        assert!(cfg.validate().is_err());
    }
}
