//! Run configuration. Defaults reproduce the fixed walkthrough: CPU devices,
//! 2048 elements, work-groups of 128, bundled kernel source.

use std::{fmt, str::FromStr};

use opencl3::{
    device::{
        CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU,
        CL_DEVICE_TYPE_DEFAULT, CL_DEVICE_TYPE_GPU,
    },
    types::cl_device_type,
};

use crate::{
    host::{KernelSource, MAX_LEN},
    ClError,
};

pub const DEFAULT_LEN: usize = 2048;
pub const DEFAULT_LOCAL_SIZE: usize = 128;

/// Which device class to ask the platform for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    #[default]
    Cpu,
    Gpu,
    Accelerator,
    Default,
    All,
}

impl DeviceKind {
    pub fn cl_type(self) -> cl_device_type {
        match self {
            DeviceKind::Cpu => CL_DEVICE_TYPE_CPU,
            DeviceKind::Gpu => CL_DEVICE_TYPE_GPU,
            DeviceKind::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
            DeviceKind::Default => CL_DEVICE_TYPE_DEFAULT,
            DeviceKind::All => CL_DEVICE_TYPE_ALL,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Gpu => "gpu",
            DeviceKind::Accelerator => "accelerator",
            DeviceKind::Default => "default",
            DeviceKind::All => "all",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceKind::Cpu),
            "gpu" => Ok(DeviceKind::Gpu),
            "accelerator" | "acc" => Ok(DeviceKind::Accelerator),
            "default" => Ok(DeviceKind::Default),
            "all" => Ok(DeviceKind::All),
            other => Err(format!(
                "unknown device type '{other}' (expected cpu, gpu, accelerator, default or all)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub device_kind: DeviceKind,
    /// Number of elements in `a`, `b` and `c`.
    pub len: usize,
    /// Work-items per work-group.
    pub local_size: usize,
    pub source: KernelSource,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            device_kind: DeviceKind::default(),
            len: DEFAULT_LEN,
            local_size: DEFAULT_LOCAL_SIZE,
            source: KernelSource::Bundled,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ClError> {
        if self.len == 0 {
            return Err(ClError::InvalidConfig("vector length must be > 0".into()));
        }
        if self.local_size == 0 {
            return Err(ClError::InvalidConfig("local work size must be > 0".into()));
        }
        if self.len > MAX_LEN {
            return Err(ClError::InvalidConfig(format!(
                "vector length {} does not fit the kernel's int argument",
                self.len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_walkthrough() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.device_kind, DeviceKind::Cpu);
        assert_eq!(cfg.len, 2048);
        assert_eq!(cfg.local_size, 128);
        assert!(matches!(cfg.source, KernelSource::Bundled));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let cfg = RunConfig { len: 0, ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(ClError::InvalidConfig(_))));

        let cfg = RunConfig { local_size: 0, ..RunConfig::default() };
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("local work size"), "unexpected error: {msg}");
    }

    #[test]
    fn oversized_len_is_rejected() {
        let cfg = RunConfig { len: MAX_LEN + 1, ..RunConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = RunConfig { len: MAX_LEN, ..RunConfig::default() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn device_kind_parses_case_insensitively() {
        assert_eq!("GPU".parse::<DeviceKind>(), Ok(DeviceKind::Gpu));
        assert_eq!("acc".parse::<DeviceKind>(), Ok(DeviceKind::Accelerator));
        assert_eq!("all".parse::<DeviceKind>(), Ok(DeviceKind::All));
        assert!("fpga".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn device_kind_maps_to_cl_type() {
        assert_eq!(DeviceKind::Cpu.cl_type(), CL_DEVICE_TYPE_CPU);
        assert_eq!(DeviceKind::Gpu.cl_type(), CL_DEVICE_TYPE_GPU);
        assert_eq!(DeviceKind::All.to_string(), "all");
    }
}
