//! The walkthrough itself: discovery → context → program → buffers →
//! enqueue → readback → release.

use std::{fmt, io::Write};

use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    device::Device,
    kernel::{ExecuteKernel, Kernel},
    memory::ClMem,
    program::Program,
    types::cl_int,
};
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::record;
#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::{
    buffer::{DeviceBuffer, Empty},
    config::RunConfig,
    discovery::discover_into,
    host::{global_work_size, init_vectors, KERNEL_NAME},
    ClError,
};

// ─── Kontext‑Info ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextReport {
    pub num_devices: usize,
    pub device_names: Vec<String>,
    pub reference_count: u32,
}

impl ContextReport {
    pub fn query(context: &Context) -> Result<Self, ClError> {
        let device_names = context
            .devices()
            .iter()
            .map(|&id| Device::new(id).name())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            num_devices: context.devices().len(),
            device_names,
            reference_count: context.reference_count()?,
        })
    }
}

impl fmt::Display for ContextReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CL_CONTEXT_NUM_DEVICES             {}", self.num_devices)?;
        write!(f, "CL_CONTEXT_DEVICES                 ")?;
        for name in &self.device_names {
            write!(f, "{name}   ")?;
        }
        writeln!(f)?;
        writeln!(f, "CL_CONTEXT_REFERENCE_COUNT         {}", self.reference_count)
    }
}

// ─── Ergebnis ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub a: Vec<cl_int>,
    pub b: Vec<cl_int>,
    pub c: Vec<cl_int>,
}

impl RunOutcome {
    /// Indices where `c[i] != a[i] + b[i]`.
    pub fn mismatches(&self) -> Vec<usize> {
        self.a
            .iter()
            .zip(&self.b)
            .zip(&self.c)
            .enumerate()
            .filter(|&(_, ((&a, &b), &c))| a.wrapping_add(b) != c)
            .map(|(i, _)| i)
            .collect()
    }

    /// One `a = .. b = .. c = a + b = ..` line per element.
    pub fn write_lines<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for ((a, b), c) in self.a.iter().zip(&self.b).zip(&self.c) {
            writeln!(out, "a = {a} b = {b} c = a + b = {c}")?;
        }
        Ok(())
    }
}

// ─── Ablauf ───────────────────────────────────────────────────────────

/// Runs every phase once and writes the walkthrough text to `out`.
///
/// Handles are locals, so they are released in reverse order of creation
/// when this returns.
pub fn run<W: Write>(config: &RunConfig, out: &mut W) -> Result<RunOutcome, ClError> {
    config.validate()?;
    let n = config.len;

    /* ---------- 1. Plattform & Geräte ----------------------------- */
    #[cfg(feature = "metrics")]
    let t = Instant::now();

    // the platform block is written even if no device matches
    let found = discover_into(out, config.device_kind)?;

    #[cfg(feature = "metrics")]
    record("discovery", t);

    /* ---------- 2. Kontext ---------------------------------------- */
    writeln!(out)?;
    writeln!(out, "Creating a context (grouping devices on which kernels will be run):")?;
    writeln!(out)?;

    let context = Context::from_device(found.first_device())?;
    let context_report = ContextReport::query(&context)?;
    write!(out, "{context_report}")?;
    info!("context created on {}", context_report.device_names.join(", "));

    /* ---------- 3. Programm & Kernel ------------------------------ */
    #[cfg(feature = "metrics")]
    let t = Instant::now();

    let src = config.source.load()?;
    let program = Program::create_and_build_from_source(&context, &src, "").map_err(|log| {
        warn!("kernel build failed");
        ClError::Build(log)
    })?;
    let kernel = Kernel::create(&program, KERNEL_NAME)?;
    debug!("kernel '{KERNEL_NAME}' ready");

    #[cfg(feature = "metrics")]
    record("program_build", t);

    #[allow(deprecated)]
    let queue = CommandQueue::create(&context, context.default_device(), 0)?;

    /* ---------- 4. Host → Device ---------------------------------- */
    let (a, b) = init_vectors(n)?;

    let d_a = DeviceBuffer::<cl_int, Empty>::read_only(&context, n)?.write_blocking(&queue, &a)?;
    let d_b = DeviceBuffer::<cl_int, Empty>::read_only(&context, n)?.write_blocking(&queue, &b)?;
    let d_c = DeviceBuffer::<cl_int, Empty>::write_only(&context, n)?;
    debug!("uploaded 2 x {} bytes", d_a.byte_len());

    /* ---------- 5. Kernel starten --------------------------------- */
    let n_arg = n as cl_int; // fits, see RunConfig::validate
    let global = global_work_size(n, config.local_size);
    debug!("launch: global={global} local={}", config.local_size);

    #[cfg(feature = "metrics")]
    let t = Instant::now();

    let kernel_done = unsafe {
        ExecuteKernel::new(&kernel)
            .set_arg(&n_arg)
            .set_arg(&d_a.raw().get())
            .set_arg(&d_b.raw().get())
            .set_arg(&d_c.raw().get())
            .set_global_work_size(global)
            .set_local_work_size(config.local_size)
            .enqueue_nd_range(&queue)?
    };
    let d_c = d_c.written_by(&kernel_done)?;

    #[cfg(feature = "metrics")]
    record("kernel", t);

    /* ---------- 6. Device → Host ---------------------------------- */
    let c = d_c.to_vec(&queue)?;
    let outcome = RunOutcome { a, b, c };

    writeln!(out)?;
    outcome.write_lines(out)?;

    let bad = outcome.mismatches();
    if bad.is_empty() {
        info!("all {n} sums verified");
    } else {
        warn!("{} of {n} sums are wrong, first at index {}", bad.len(), bad[0]);
    }

    queue.flush()?;
    queue.finish()?;
    Ok(outcome)
}
