//! Device configuration
//!
//! A [`DeviceConfig`] describes the limits an emulated device reports to the algorithm
//! engines: compute units, maximum work-group size, local and global memory sizes.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Environment variable overriding the compute-unit count
pub const ENV_COMPUTE_UNITS: &str = "DEVPAR_COMPUTE_UNITS";
/// Environment variable overriding the maximum work-group size
pub const ENV_MAX_WORK_GROUP_SIZE: &str = "DEVPAR_MAX_WORK_GROUP_SIZE";
/// Environment variable overriding the local memory size in bytes
pub const ENV_LOCAL_MEM_SIZE: &str = "DEVPAR_LOCAL_MEM_SIZE";
/// Environment variable overriding the global memory size in bytes
pub const ENV_GLOBAL_MEM_SIZE: &str = "DEVPAR_GLOBAL_MEM_SIZE";
/// Environment variable overriding the device kind (`cpu` or `gpu`)
pub const ENV_DEVICE_KIND: &str = "DEVPAR_DEVICE_KIND";

const DEFAULT_MAX_WORK_GROUP_SIZE: usize = 256;
const DEFAULT_LOCAL_MEM_SIZE: usize = 64 * 1024;
const DEFAULT_GLOBAL_MEM_SIZE: usize = 1 << 31;
const CPU_KERNEL_GROUP_SIZE_DIVISOR: usize = 4;

/// Class of device being emulated
///
/// Some tuning constants depend on it: merge bunch size, and the compiled-kernel
/// work-group size divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceKind {
    /// CPU-like device: few compute units, small effective groups
    #[default]
    Cpu,
    /// GPU-like device
    Gpu,
}

impl DeviceKind {
    /// Returns true for CPU-like devices
    #[inline]
    pub fn is_cpu(self) -> bool {
        matches!(self, Self::Cpu)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Gpu => f.write_str("gpu"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            other => Err(Error::invalid_argument(
                "device_kind",
                format!("expected 'cpu' or 'gpu', got '{other}'"),
            )),
        }
    }
}

/// Limits reported by an emulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: String,
    /// Device class
    pub kind: DeviceKind,
    /// Number of compute units (worker threads backing the device)
    pub compute_units: usize,
    /// Largest work-group size the device accepts
    pub max_work_group_size: usize,
    /// Local scratch available to one work-group, in bytes
    pub local_mem_size: usize,
    /// Total global memory, in bytes
    pub global_mem_size: usize,
    /// Divisor applied to `max_work_group_size` by the compiled-kernel query on
    /// CPU-like devices
    pub kernel_group_size_divisor: usize,
}

impl DeviceConfig {
    /// Configuration of the host machine as a CPU-like device
    pub fn host() -> Self {
        let compute_units = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            name: "cpu".to_string(),
            kind: DeviceKind::Cpu,
            compute_units,
            max_work_group_size: DEFAULT_MAX_WORK_GROUP_SIZE,
            local_mem_size: DEFAULT_LOCAL_MEM_SIZE,
            global_mem_size: DEFAULT_GLOBAL_MEM_SIZE,
            kernel_group_size_divisor: CPU_KERNEL_GROUP_SIZE_DIVISOR,
        }
    }

    /// Host configuration with overrides read from `DEVPAR_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Host configuration with overrides supplied by `lookup`
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::host();
        if let Some(v) = parse_size(&lookup, ENV_COMPUTE_UNITS)? {
            config.compute_units = v;
        }
        if let Some(v) = parse_size(&lookup, ENV_MAX_WORK_GROUP_SIZE)? {
            config.max_work_group_size = v;
        }
        if let Some(v) = parse_size(&lookup, ENV_LOCAL_MEM_SIZE)? {
            config.local_mem_size = v;
        }
        if let Some(v) = parse_size(&lookup, ENV_GLOBAL_MEM_SIZE)? {
            config.global_mem_size = v;
        }
        if let Some(kind) = lookup(ENV_DEVICE_KIND) {
            config.kind = kind.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the device name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the device kind
    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the compute-unit count
    pub fn with_compute_units(mut self, compute_units: usize) -> Self {
        self.compute_units = compute_units;
        self
    }

    /// Set the maximum work-group size
    pub fn with_max_work_group_size(mut self, size: usize) -> Self {
        self.max_work_group_size = size;
        self
    }

    /// Set the local memory size in bytes
    pub fn with_local_mem_size(mut self, bytes: usize) -> Self {
        self.local_mem_size = bytes;
        self
    }

    /// Set the global memory size in bytes
    pub fn with_global_mem_size(mut self, bytes: usize) -> Self {
        self.global_mem_size = bytes;
        self
    }

    /// Set the compiled-kernel work-group size divisor
    pub fn with_kernel_group_size_divisor(mut self, divisor: usize) -> Self {
        self.kernel_group_size_divisor = divisor;
        self
    }

    /// Check that every limit is usable
    ///
    /// Sizes must be non-zero and the maximum work-group size a power of two.
    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("compute_units", self.compute_units),
            ("max_work_group_size", self.max_work_group_size),
            ("local_mem_size", self.local_mem_size),
            ("global_mem_size", self.global_mem_size),
            ("kernel_group_size_divisor", self.kernel_group_size_divisor),
        ];
        for (arg, value) in non_zero {
            if value == 0 {
                return Err(Error::invalid_argument(arg, "must be non-zero"));
            }
        }
        if !self.max_work_group_size.is_power_of_two() {
            return Err(Error::invalid_argument(
                "max_work_group_size",
                format!("{} is not a power of two", self.max_work_group_size),
            ));
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::host()
    }
}

fn parse_size(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<usize>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| Error::invalid_argument(key, format!("'{raw}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_host_config_is_valid() {
        let config = DeviceConfig::host();
        assert!(config.validate().is_ok());
        assert!(config.compute_units >= 1);
        assert!(config.kind.is_cpu());
    }

    #[test]
    fn test_env_overrides() {
        let config = DeviceConfig::from_lookup(lookup_from(&[
            (ENV_COMPUTE_UNITS, "3"),
            (ENV_MAX_WORK_GROUP_SIZE, "64"),
            (ENV_DEVICE_KIND, "GPU"),
        ]))
        .unwrap();
        assert_eq!(config.compute_units, 3);
        assert_eq!(config.max_work_group_size, 64);
        assert_eq!(config.kind, DeviceKind::Gpu);
        assert_eq!(config.local_mem_size, DEFAULT_LOCAL_MEM_SIZE);
    }

    #[test]
    fn test_malformed_env_is_rejected() {
        let err = DeviceConfig::from_lookup(lookup_from(&[(ENV_LOCAL_MEM_SIZE, "lots")])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidArgument {
                arg: ENV_LOCAL_MEM_SIZE,
                ..
            }
        ));
        assert!(DeviceConfig::from_lookup(lookup_from(&[(ENV_DEVICE_KIND, "fpga")])).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        assert!(DeviceConfig::host().with_compute_units(0).validate().is_err());
        assert!(
            DeviceConfig::host()
                .with_max_work_group_size(48)
                .validate()
                .is_err()
        );
        assert!(
            DeviceConfig::host()
                .with_max_work_group_size(1)
                .validate()
                .is_ok()
        );
    }
}
