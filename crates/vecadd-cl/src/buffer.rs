//! Device buffers with a typestate for "holds data" vs. "only allocated".
//!
//! `DeviceBuffer<T, Empty>` is what `clCreateBuffer` gives back. Writing host
//! data, or waiting for the kernel that writes it, moves it to `Filled`; only
//! `Filled` buffers can be read back.

use std::{marker::PhantomData, mem::size_of, ptr};

use bytemuck::{cast_slice, cast_slice_mut, Pod};
use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    event::Event,
    memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY},
    types::{cl_mem_flags, CL_BLOCKING},
};

#[cfg(feature = "metrics")]
use crate::metrics::{record, ALLOCS, ALLOC_BYTES};
#[cfg(feature = "metrics")]
use std::{sync::atomic::Ordering, time::Instant};

use crate::ClError;

// ─── Typ‑State‑Marker ────────────────────────────────────────────────
mod sealed {
    pub trait Sealed {}
}

pub trait State: sealed::Sealed {}

pub struct Empty;
impl sealed::Sealed for Empty {}
impl State for Empty {}

pub struct Filled;
impl sealed::Sealed for Filled {}
impl State for Filled {}

// ─── Buffer ──────────────────────────────────────────────────────────
pub struct DeviceBuffer<T, S: State> {
    buf: Buffer<u8>,
    /// element count, not bytes
    len: usize,
    _marker: PhantomData<(T, S)>,
}

impl<T: Pod, S: State> DeviceBuffer<T, S> {
    fn with_state<N: State>(self) -> DeviceBuffer<T, N> {
        DeviceBuffer { buf: self.buf, len: self.len, _marker: PhantomData }
    }

    /// The underlying OpenCL memory object, for kernel arguments.
    pub fn raw(&self) -> &Buffer<u8> {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len * size_of::<T>()
    }

    fn check_host_len(&self, host_len: usize) -> Result<(), ClError> {
        if host_len != self.len {
            return Err(ClError::InvalidSize(host_len));
        }
        Ok(())
    }
}

// ── Empty ────────────────────────────────────────────────────────────
impl<T: Pod> DeviceBuffer<T, Empty> {
    /// Allocates `len` elements on the device; contents are undefined.
    pub fn new(context: &Context, flags: cl_mem_flags, len: usize) -> Result<Self, ClError> {
        if len == 0 {
            return Err(ClError::InvalidSize(len));
        }
        let bytes = len * size_of::<T>();

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        let buf = unsafe { Buffer::<u8>::create(context, flags, bytes, ptr::null_mut())? };

        #[cfg(feature = "metrics")]
        {
            record("buffer_create", t);
            ALLOCS.fetch_add(1, Ordering::Relaxed);
            ALLOC_BYTES.fetch_add(bytes, Ordering::Relaxed);
        }

        Ok(Self { buf, len, _marker: PhantomData })
    }

    /// Kernel input: the device only reads it.
    pub fn read_only(context: &Context, len: usize) -> Result<Self, ClError> {
        Self::new(context, CL_MEM_READ_ONLY, len)
    }

    /// Kernel output: the device only writes it.
    pub fn write_only(context: &Context, len: usize) -> Result<Self, ClError> {
        Self::new(context, CL_MEM_WRITE_ONLY, len)
    }

    /// Blocking host → device copy of the whole buffer.
    pub fn write_blocking(
        mut self,
        queue: &CommandQueue,
        host: &[T],
    ) -> Result<DeviceBuffer<T, Filled>, ClError> {
        self.check_host_len(host.len())?;

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        unsafe {
            queue.enqueue_write_buffer(&mut self.buf, CL_BLOCKING, 0, cast_slice(host), &[])?;
        }

        #[cfg(feature = "metrics")]
        record("enqueue_write", t);

        Ok(self.with_state())
    }

    /// Waits for the kernel that fills this buffer, then treats it as written.
    pub fn written_by(self, kernel_done: &Event) -> Result<DeviceBuffer<T, Filled>, ClError> {
        #[cfg(feature = "metrics")]
        let t = Instant::now();

        kernel_done.wait()?;

        #[cfg(feature = "metrics")]
        record("kernel_wait", t);

        Ok(self.with_state())
    }
}

// ── Filled → Host ────────────────────────────────────────────────────
impl<T: Pod> DeviceBuffer<T, Filled> {
    /// Blocking device → host copy into `host_out`.
    pub fn read_blocking(&self, queue: &CommandQueue, host_out: &mut [T]) -> Result<(), ClError> {
        self.check_host_len(host_out.len())?;

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        unsafe {
            queue.enqueue_read_buffer(&self.buf, CL_BLOCKING, 0, cast_slice_mut(host_out), &[])?;
        }

        #[cfg(feature = "metrics")]
        record("enqueue_read", t);

        Ok(())
    }

    pub fn to_vec(&self, queue: &CommandQueue) -> Result<Vec<T>, ClError> {
        let mut out = vec![T::zeroed(); self.len];
        self.read_blocking(queue, &mut out)?;
        Ok(out)
    }
}
