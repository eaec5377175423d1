//! Host-side pieces that do not touch the OpenCL runtime.

use std::{
    fs,
    path::{Path, PathBuf},
};

use opencl3::types::cl_int;
use tracing::debug;

use crate::ClError;

/// Entry point compiled out of `kernel_add.cl`.
pub const KERNEL_NAME: &str = "add";

static BUNDLED_SOURCE: &str = include_str!("../kernels/kernel_add.cl");

/// Where the kernel text comes from.
#[derive(Debug, Clone)]
pub enum KernelSource {
    /// `kernels/kernel_add.cl`, compiled into the binary.
    Bundled,
    File(PathBuf),
}

impl KernelSource {
    pub fn load(&self) -> Result<String, ClError> {
        match self {
            KernelSource::Bundled => Ok(BUNDLED_SOURCE.to_owned()),
            KernelSource::File(path) => load_source(path),
        }
    }
}

/// Reads the whole kernel file into memory.
pub fn load_source(path: impl AsRef<Path>) -> Result<String, ClError> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|source| ClError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded {} bytes of kernel source from {}", src.len(), path.display());
    Ok(src)
}

/// Longest vector the kernel's `int N` argument (and `b[N-1] = N`) can describe.
pub const MAX_LEN: usize = cl_int::MAX as usize;

/// `a[i] = i`, `b[i] = i + 1`; `n > MAX_LEN` is rejected before allocating.
pub fn init_vectors(n: usize) -> Result<(Vec<cl_int>, Vec<cl_int>), ClError> {
    if n > MAX_LEN {
        return Err(ClError::InvalidSize(n));
    }
    // i < n <= cl_int::MAX, so neither the cast nor the +1 can overflow
    let a: Vec<cl_int> = (0..n).map(|i| i as cl_int).collect();
    let b: Vec<cl_int> = a.iter().map(|&x| x + 1).collect();
    Ok((a, b))
}

/// Smallest multiple of `local` that is `>= n`.
///
/// # Panics
/// If `local` is zero.
pub fn global_work_size(n: usize, local: usize) -> usize {
    n.div_ceil(local) * local
}
