//! Host resource sampling (CPU / RAM / disk utilization).
//!
//! `SysinfoProbe` keeps one `sysinfo::System` for the process lifetime: CPU
//! usage is computed between two refreshes, so each scrape reports usage
//! since the previous one. Disk usage comes from `statvfs` on the configured
//! path. Refreshes are blocking calls; callers run `sample` on the blocking
//! pool.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

#[cfg(not(unix))]
use sysinfo::Disks;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

use census_core::error::{CensusError, Result};

/// Instantaneous utilization, each value in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSample {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub storage_percent: f64,
}

/// Source of host samples. Blocking.
pub trait HostProbe: Send + Sync {
    fn sample(&self) -> Result<HostSample>;
}

fn percent(name: &str, v: f64) -> Result<f64> {
    if !v.is_finite() {
        return Err(CensusError::Sampling(format!("{name} is not a finite number")));
    }
    Ok(v.clamp(0.0, 100.0))
}

/// Share of `used` in `total`, as a percentage.
fn ratio(name: &str, used: u64, total: u64) -> Result<f64> {
    if total == 0 {
        return Err(CensusError::Sampling(format!("{name}: total is zero")));
    }
    percent(name, used as f64 / total as f64 * 100.0)
}

/// Filesystem usage from block counts. Blocks reserved for root are neither
/// used nor available, so an empty volume reports 0%.
fn storage_percent(blocks: u64, free: u64, available: u64) -> Result<f64> {
    let used = blocks.saturating_sub(free);
    ratio("storage_usage", used, used.saturating_add(available))
}

struct SystemState {
    system: System,
    last_cpu_refresh: Instant,
}

pub struct SysinfoProbe {
    mount: PathBuf,
    state: Mutex<SystemState>,
}

impl SysinfoProbe {
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            mount: mount.into(),
            state: Mutex::new(SystemState {
                system,
                last_cpu_refresh: Instant::now(),
            }),
        }
    }

    fn sample_cpu_and_ram(&self) -> Result<(f64, f64)> {
        let mut st = self
            .state
            .lock()
            .map_err(|_| CensusError::Sampling("system state poisoned".into()))?;

        // sysinfo needs a minimum gap between two CPU refreshes.
        let since = st.last_cpu_refresh.elapsed();
        if since < MINIMUM_CPU_UPDATE_INTERVAL {
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL - since);
        }
        st.system.refresh_cpu_usage();
        st.last_cpu_refresh = Instant::now();
        if st.system.cpus().is_empty() {
            return Err(CensusError::Sampling("no cpu information available".into()));
        }
        let cpu = percent("cpu_usage", f64::from(st.system.global_cpu_usage()))?;

        st.system.refresh_memory();
        let ram = ratio("ram_usage", st.system.used_memory(), st.system.total_memory())?;

        Ok((cpu, ram))
    }

    #[cfg(unix)]
    fn sample_storage(&self) -> Result<f64> {
        let st = nix::sys::statvfs::statvfs(self.mount.as_path()).map_err(|e| {
            CensusError::Sampling(format!("statvfs {} failed: {e}", self.mount.display()))
        })?;
        storage_percent(
            u64::from(st.blocks()),
            u64::from(st.blocks_free()),
            u64::from(st.blocks_available()),
        )
    }

    #[cfg(not(unix))]
    fn sample_storage(&self) -> Result<f64> {
        let disks = Disks::new_with_refreshed_list();
        // The disk holding the configured path: longest mount point prefix.
        let disk = disks
            .list()
            .iter()
            .filter(|d| self.mount.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .ok_or_else(|| {
                CensusError::Sampling(format!("no disk mounted at {}", self.mount.display()))
            })?;

        let total = disk.total_space();
        let available = disk.available_space();
        storage_percent(total, available, available)
    }
}

impl HostProbe for SysinfoProbe {
    fn sample(&self) -> Result<HostSample> {
        let (cpu_percent, ram_percent) = self.sample_cpu_and_ram()?;
        let storage_percent = self.sample_storage()?;
        Ok(HostSample {
            cpu_percent,
            ram_percent,
            storage_percent,
        })
    }
}
