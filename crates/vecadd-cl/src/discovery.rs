//! Platform and device discovery.
//!
//! Querying and printing are split: [`PlatformReport`] and [`DeviceReport`]
//! are plain data filled from the runtime, their `Display` impls produce the
//! labelled text the walkthrough prints.

use std::{
    fmt,
    io::{self, Write},
};

use opencl3::{
    device::Device,
    platform::{get_platforms, Platform},
};
use tracing::{debug, info};

use crate::{config::DeviceKind, ClError};

// ─── Plattform ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformReport {
    /// Platforms the ICD loader reported in total; only the first is used.
    pub count: usize,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub profile: String,
    pub extensions: String,
}

impl PlatformReport {
    pub fn query(platform: &Platform, count: usize) -> Result<Self, ClError> {
        Ok(Self {
            count,
            name: platform.name()?,
            vendor: platform.vendor()?,
            version: platform.version()?,
            profile: platform.profile()?,
            extensions: platform.extensions()?,
        })
    }
}

impl fmt::Display for PlatformReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Detected {} platforms", self.count)?;
        writeln!(f, "Using OpenCL to get more information about the platform:")?;
        writeln!(f)?;
        writeln!(f, "CL_PLATFORM_NAME       --- {}", self.name)?;
        writeln!(f, "CL_PLATFORM_VENDOR     --- {}", self.vendor)?;
        writeln!(f, "CL_PLATFORM_VERSION    --- {}", self.version)?;
        writeln!(f, "CL_PLATFORM_PROFILE    --- {}", self.profile)?;
        writeln!(f, "CL_PLATFORM_EXTENSIONS --- {}", self.extensions)
    }
}

// ─── Geräte ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub name: String,
    pub available: bool,
    pub address_bits: u32,
    pub max_clock_mhz: u32,
    pub global_mem_bytes: u64,
    pub max_work_group_size: usize,
    pub local_mem_bytes: u64,
    pub max_work_item_dims: u32,
    /// X, Y, Z; missing dimensions are reported as 0.
    pub max_work_item_sizes: [usize; 3],
}

impl DeviceReport {
    pub fn query(device: &Device) -> Result<Self, ClError> {
        let mut max_work_item_sizes = [0usize; 3];
        for (slot, size) in max_work_item_sizes
            .iter_mut()
            .zip(device.max_work_item_sizes()?)
        {
            *slot = size;
        }

        Ok(Self {
            name: device.name()?,
            available: device.available()?,
            address_bits: device.address_bits()?,
            max_clock_mhz: device.max_clock_frequency()?,
            global_mem_bytes: device.global_mem_size()?,
            max_work_group_size: device.max_work_group_size()?,
            local_mem_bytes: device.local_mem_size()?,
            max_work_item_dims: device.max_work_item_dimensions()?,
            max_work_item_sizes,
        })
    }

    /// A plausible mid-range CPU device, for formatting tests.
    pub fn mock() -> Self {
        Self {
            name: "Mock CPU Device".into(),
            available: true,
            address_bits: 64,
            max_clock_mhz: 2400,
            global_mem_bytes: 8_000_000_000,
            max_work_group_size: 1024,
            local_mem_bytes: 32_768,
            max_work_item_dims: 3,
            max_work_item_sizes: [1024, 1024, 1024],
        }
    }
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.max_work_item_sizes;
        writeln!(f, "CL_DEVICE_NAME                     {}", self.name)?;
        writeln!(f, "CL_DEVICE_AVAILABLE                {}", u8::from(self.available))?;
        writeln!(f, "CL_DEVICE_ADDRESS_BITS             {} bits", self.address_bits)?;
        writeln!(f, "CL_DEVICE_MAX_CLOCK_FREQUENCY      {} MHz", self.max_clock_mhz)?;
        writeln!(
            f,
            "CL_DEVICE_GLOBAL_MEM_SIZE          {} GB",
            self.global_mem_bytes as f64 / 1e9
        )?;
        writeln!(f, "CL_DEVICE_MAX_WORK_GROUP_SIZE      {} work items", self.max_work_group_size)?;
        writeln!(f, "CL_DEVICE_LOCAL_MEM_SIZE           {} Bytes", self.local_mem_bytes)?;
        writeln!(f, "CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS {}", self.max_work_item_dims)?;
        writeln!(f, "CL_DEVICE_MAX_WORK_ITEM_SIZES : X  {x} work items")?;
        writeln!(f, "                              : Y  {y} work items")?;
        writeln!(f, "                              : Z  {z} work items")
    }
}

// ─── Ergebnis ─────────────────────────────────────────────────────────

/// First platform plus every device of the requested kind on it.
#[derive(Debug)]
pub struct Discovery {
    pub platform: Platform,
    pub devices: Vec<Device>,
    pub platform_report: PlatformReport,
    pub device_reports: Vec<DeviceReport>,
}

impl Discovery {
    /// Device the context is built on.
    pub fn first_device(&self) -> &Device {
        // discover_devices() never returns an empty list
        &self.devices[0]
    }
}

/// The part printed once the device list is known.
pub struct DeviceSection<'a>(pub &'a [DeviceReport]);

impl fmt::Display for DeviceSection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Number of connected devices found = {}", self.0.len())?;
        writeln!(f)?;
        writeln!(f, "Running OpenCL code to get device specifications:")?;
        writeln!(f)?;
        for report in self.0 {
            writeln!(f, "{report}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.platform_report)?;
        write!(f, "{}", DeviceSection(&self.device_reports))
    }
}

/// First platform reported by the ICD loader, or [`ClError::NoPlatform`].
pub fn discover_platform() -> Result<(Platform, PlatformReport), ClError> {
    let platforms = get_platforms().map_err(|e| {
        debug!("clGetPlatformIDs failed: {e}");
        ClError::NoPlatform
    })?;
    let Some(&platform) = platforms.first() else {
        return Err(ClError::NoPlatform);
    };
    let platform_report = PlatformReport::query(&platform, platforms.len())?;
    debug!("using OpenCL platform: {}", platform_report.name);
    Ok((platform, platform_report))
}

/// Devices of type `kind` on `platform`, or [`ClError::NoDevice`]; the runtime
/// reports "no devices" as `CL_DEVICE_NOT_FOUND`, which is folded into it.
pub fn discover_devices(
    platform: &Platform,
    kind: DeviceKind,
) -> Result<(Vec<Device>, Vec<DeviceReport>), ClError> {
    let device_ids = platform.get_devices(kind.cl_type()).map_err(|e| {
        debug!("clGetDeviceIDs({kind}) failed: {e}");
        ClError::NoDevice
    })?;
    if device_ids.is_empty() {
        return Err(ClError::NoDevice);
    }

    let devices: Vec<Device> = device_ids.into_iter().map(Device::new).collect();
    let device_reports = devices
        .iter()
        .map(DeviceReport::query)
        .collect::<Result<Vec<_>, _>>()?;
    info!("found {} {kind} device(s)", devices.len());
    Ok((devices, device_reports))
}

/// Runs both discovery steps, writing each report to `out` as soon as it is
/// known: a platform without matching devices still prints its platform block.
pub fn write_discovery<W, P, D>(out: &mut W, platform: P, devices: D) -> Result<Discovery, ClError>
where
    W: Write,
    P: FnOnce() -> Result<(Platform, PlatformReport), ClError>,
    D: FnOnce(&Platform) -> Result<(Vec<Device>, Vec<DeviceReport>), ClError>,
{
    let (platform, platform_report) = platform()?;
    write!(out, "{platform_report}")?;

    let (devices, device_reports) = devices(&platform)?;
    write!(out, "{}", DeviceSection(&device_reports))?;

    Ok(Discovery { platform, devices, platform_report, device_reports })
}

/// [`write_discovery`] against the real runtime.
pub fn discover_into<W: Write>(out: &mut W, kind: DeviceKind) -> Result<Discovery, ClError> {
    write_discovery(out, discover_platform, |platform| discover_devices(platform, kind))
}

/// Same as [`discover_into`] without printing anything.
pub fn discover(kind: DeviceKind) -> Result<Discovery, ClError> {
    discover_into(&mut io::sink(), kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_platform() -> PlatformReport {
        PlatformReport {
            count: 2,
            name: "Mock Platform".into(),
            vendor: "MockVendor".into(),
            version: "OpenCL 1.2 mock".into(),
            profile: "FULL_PROFILE".into(),
            extensions: "cl_khr_icd".into(),
        }
    }

    #[test]
    fn platform_report_lists_every_field() {
        let text = mock_platform().to_string();
        assert!(text.starts_with("Detected 2 platforms\n"));
        assert!(text.contains("CL_PLATFORM_NAME       --- Mock Platform\n"));
        assert!(text.contains("CL_PLATFORM_VENDOR     --- MockVendor\n"));
        assert!(text.contains("CL_PLATFORM_VERSION    --- OpenCL 1.2 mock\n"));
        assert!(text.contains("CL_PLATFORM_PROFILE    --- FULL_PROFILE\n"));
        assert!(text.ends_with("CL_PLATFORM_EXTENSIONS --- cl_khr_icd\n"));
    }

    #[test]
    fn device_report_units() {
        let text = DeviceReport::mock().to_string();
        assert!(text.contains("CL_DEVICE_NAME                     Mock CPU Device\n"));
        assert!(text.contains("CL_DEVICE_AVAILABLE                1\n"));
        assert!(text.contains("64 bits"));
        assert!(text.contains("2400 MHz"));
        assert!(text.contains("CL_DEVICE_GLOBAL_MEM_SIZE          8 GB"));
        assert!(text.contains("1024 work items"));
        assert!(text.contains("32768 Bytes"));
        assert!(text.contains("CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS 3\n"));
    }

    #[test]
    fn device_report_work_item_sizes_per_axis() {
        let report = DeviceReport {
            max_work_item_sizes: [256, 128, 64],
            ..DeviceReport::mock()
        };
        let lines: Vec<String> = report.to_string().lines().map(str::to_owned).collect();
        assert_eq!(lines.len(), 11);
        assert!(lines[8].ends_with(": X  256 work items"));
        assert!(lines[9].ends_with(": Y  128 work items"));
        assert!(lines[10].ends_with(": Z  64 work items"));
    }

    #[test]
    fn unavailable_device_prints_zero() {
        let report = DeviceReport { available: false, ..DeviceReport::mock() };
        assert!(report.to_string().contains("CL_DEVICE_AVAILABLE                0\n"));
    }

    fn unqueried_platform() -> Platform {
        Platform::new(std::ptr::null_mut())
    }

    #[test]
    fn missing_devices_still_print_platform_block() {
        let mut out = Vec::new();
        let result = write_discovery(
            &mut out,
            || Ok((unqueried_platform(), mock_platform())),
            |_| Err(ClError::NoDevice),
        );
        assert!(matches!(result, Err(ClError::NoDevice)));
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, mock_platform().to_string());
        assert!(!text.contains("Number of connected devices"));
    }

    #[test]
    fn missing_platform_prints_nothing() {
        let mut out = Vec::new();
        let result = write_discovery(
            &mut out,
            || Err(ClError::NoPlatform),
            |_| panic!("devices must not be queried without a platform"),
        );
        assert!(matches!(result, Err(ClError::NoPlatform)));
        assert!(out.is_empty());
    }

    #[test]
    fn full_discovery_prints_platform_then_devices() {
        let mut out = Vec::new();
        let found = write_discovery(
            &mut out,
            || Ok((unqueried_platform(), mock_platform())),
            |_| Ok((vec![Device::new(std::ptr::null_mut())], vec![DeviceReport::mock()])),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, found.to_string());
        let platform_at = text.find("CL_PLATFORM_EXTENSIONS").unwrap();
        let count_at = text.find("Number of connected devices found = 1").unwrap();
        let device_at = text.find("CL_DEVICE_NAME").unwrap();
        assert!(platform_at < count_at && count_at < device_at);
    }

    #[test]
    fn discover_is_graceful_without_runtime() {
        match discover(DeviceKind::All) {
            Ok(found) => {
                assert!(!found.devices.is_empty());
                assert_eq!(found.devices.len(), found.device_reports.len());
                assert!(found.platform_report.count >= 1);
            }
            Err(e) => assert!(e.is_discovery() || matches!(e, ClError::Api(_)), "unexpected error: {e}"),
        }
    }
}
