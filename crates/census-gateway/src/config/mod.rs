//! Service config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use census_core::error::{CensusError, Result};

pub use schema::{LogFormat, OtlpSection, ServiceConfig, ServiceSection, TelemetrySection};

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "CENSUS_CONFIG";
/// Config file read when `CENSUS_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "census.yaml";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| CensusError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| CensusError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the config the binary starts with.
///
/// An explicit `CENSUS_CONFIG` must point at a readable file. Without it the
/// default path is tried, and built-in defaults are used when that is absent.
pub fn load_from_env() -> Result<ServiceConfig> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return load_from_file(&path);
    }
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return load_from_file(DEFAULT_CONFIG_PATH);
    }
    let cfg = ServiceConfig::default();
    cfg.validate()?;
    Ok(cfg)
}
