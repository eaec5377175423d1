//! Host-side walkthrough of the OpenCL API: discover a platform and its
//! devices, build a context, compile the `add` kernel, move two integer
//! vectors to the device, launch once and read the sum back.
//!
//! The `vecadd-cl` binary exits with 0 on success and 1 otherwise. "No
//! platform" and "no device" are printed on stdout after whatever discovery
//! text was already written; every other failure (context, build, buffer
//! I/O) is propagated as a [`ClError`], logged on stderr and also exits 1.

// ─── Module ───────────────────────────────────────────────────────────
pub mod buffer;
pub mod config;
pub mod discovery;
pub mod host;
pub mod pipeline;

#[cfg(feature = "metrics")]
mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::*;

pub use buffer::{DeviceBuffer, Empty, Filled};
pub use config::{DeviceKind, RunConfig};
pub use discovery::{
    discover, discover_devices, discover_into, discover_platform, write_discovery, DeviceReport,
    Discovery, PlatformReport,
};
pub use host::{global_work_size, init_vectors, load_source, KernelSource};
pub use pipeline::{run, ContextReport, RunOutcome};

use std::path::PathBuf;

// ─── Fehler‑Typ ───────────────────────────────────────────────────────
#[derive(thiserror::Error, Debug)]
pub enum ClError {
    #[error("OpenCL error code {0}")]
    Api(i32),
    #[error("Couldn't find any platforms")]
    NoPlatform,
    #[error("Couldn't find any devices")]
    NoDevice,
    #[error("program build failed: {0}")]
    Build(String),
    #[error("Invalid buffer size: {0}")]
    InvalidSize(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot read kernel source {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write report: {0}")]
    Output(#[from] std::io::Error),
}

impl ClError {
    /// Discovery failures are the only ones reported on stdout.
    pub fn is_discovery(&self) -> bool {
        matches!(self, ClError::NoPlatform | ClError::NoDevice)
    }
}

impl From<opencl3::error_codes::ClError> for ClError {
    fn from(err: opencl3::error_codes::ClError) -> Self {
        ClError::Api(err.0)
    }
}

impl From<i32> for ClError {
    fn from(code: i32) -> Self {
        ClError::Api(code)
    }
}
