//! Compute pass encoding.
//!
//! A [`ComputeEncoder`] mutably borrows its command buffer, so the buffer
//! cannot be committed while a pass is open, and [`ComputeEncoder::end_encoding`]
//! consumes the encoder so nothing can be recorded after it.

use std::ffi::c_void;

use objc2_metal::MTLSize;
use objc_bridge::Owned;
use tracing::{debug, error, warn};

use crate::buffer::Buffer;
use crate::bytes::AsBytes;
use crate::command::CommandBuffer;
use crate::error::{ComputeError, Result};
use crate::grid::GridSize;
use crate::handle::PipelineState;
use crate::slots::{BufferSlots, MAX_BUFFER_BINDINGS};

/// Largest inline parameter block accepted by [`ComputeEncoder::set_bytes`].
pub const MAX_INLINE_BYTES: usize = 4096;

/// An open compute pass on a [`CommandBuffer`].
pub struct ComputeEncoder<'cb, 'a> {
    object: Owned,
    command_buffer: &'cb mut CommandBuffer<'a>,
    /// Set once a pipeline state is bound.
    max_threads_per_threadgroup: Option<usize>,
    /// Slots the bound pipeline reads.
    required: BufferSlots,
    /// Slots filled by `set_buffer` or `set_bytes`.
    bound: BufferSlots,
    ended: bool,
}

impl<'cb, 'a> ComputeEncoder<'cb, 'a> {
    pub(crate) fn new(object: Owned, command_buffer: &'cb mut CommandBuffer<'a>) -> Self {
        Self {
            object,
            command_buffer,
            max_threads_per_threadgroup: None,
            required: BufferSlots::new(),
            bound: BufferSlots::new(),
            ended: false,
        }
    }

    pub fn set_compute_pipeline_state(&mut self, state: &PipelineState<'a>) -> Result<()> {
        let max = state.max_total_threads_per_threadgroup()?;
        unsafe {
            objc_bridge::send_instance::<_, ()>(
                self.object.as_ptr(),
                "setComputePipelineState:",
                (state.as_object(),),
            )?
        };
        self.max_threads_per_threadgroup = Some(max);
        self.required = state.buffer_slots();
        Ok(())
    }

    /// Bind `buffer` at slot `index`, starting `offset` bytes in.
    pub fn set_buffer(&mut self, buffer: &Buffer<'a>, offset: usize, index: usize) -> Result<()> {
        check_index(index)?;
        if offset >= buffer.length() {
            return Err(ComputeError::BufferRange {
                offset,
                length: buffer.length(),
            });
        }
        unsafe {
            objc_bridge::send_instance::<_, ()>(
                self.object.as_ptr(),
                "setBuffer:offset:atIndex:",
                (buffer.as_object(), offset, index),
            )?
        };
        self.command_buffer.track(buffer);
        self.bound.insert(index);
        Ok(())
    }

    /// Copy `bytes` into the pass as an inline argument at slot `index`.
    pub fn set_bytes(&mut self, bytes: &[u8], index: usize) -> Result<()> {
        check_index(index)?;
        if bytes.is_empty() || bytes.len() > MAX_INLINE_BYTES {
            return Err(ComputeError::InlineBytes {
                length: bytes.len(),
                max: MAX_INLINE_BYTES,
            });
        }
        unsafe {
            objc_bridge::send_instance::<_, ()>(
                self.object.as_ptr(),
                "setBytes:length:atIndex:",
                (bytes.as_ptr().cast::<c_void>(), bytes.len(), index),
            )?
        };
        self.bound.insert(index);
        Ok(())
    }

    /// [`set_bytes`](Self::set_bytes) for a plain value.
    pub fn set_value<T: AsBytes>(&mut self, value: &T, index: usize) -> Result<()> {
        self.set_bytes(value.as_bytes(), index)
    }

    /// Dispatch `threadgroups` groups of `threads_per_threadgroup` threads.
    pub fn dispatch_threadgroups(
        &mut self,
        threadgroups: impl Into<GridSize>,
        threads_per_threadgroup: impl Into<GridSize>,
    ) -> Result<()> {
        let (threadgroups, threads) =
            self.check_dispatch(threadgroups.into(), threads_per_threadgroup.into())?;
        unsafe {
            objc_bridge::send_instance::<_, ()>(
                self.object.as_ptr(),
                "dispatchThreadgroups:threadsPerThreadgroup:",
                (MTLSize::from(threadgroups), MTLSize::from(threads)),
            )?
        };
        debug!(%threadgroups, %threads, "dispatched threadgroups");
        Ok(())
    }

    /// One-dimensional [`dispatch_threadgroups`](Self::dispatch_threadgroups).
    pub fn dispatch_threadgroups_1d(
        &mut self,
        threadgroups: usize,
        threads_per_threadgroup: usize,
    ) -> Result<()> {
        self.dispatch_threadgroups(
            GridSize::linear(threadgroups),
            GridSize::linear(threads_per_threadgroup),
        )
    }

    /// Dispatch exactly `threads` threads; edge threadgroups may be partial.
    pub fn dispatch_threads(
        &mut self,
        threads: impl Into<GridSize>,
        threads_per_threadgroup: impl Into<GridSize>,
    ) -> Result<()> {
        let (grid, group) = self.check_dispatch(threads.into(), threads_per_threadgroup.into())?;
        unsafe {
            objc_bridge::send_instance::<_, ()>(
                self.object.as_ptr(),
                "dispatchThreads:threadsPerThreadgroup:",
                (MTLSize::from(grid), MTLSize::from(group)),
            )?
        };
        debug!(%grid, %group, "dispatched threads");
        Ok(())
    }

    fn check_dispatch(&self, grid: GridSize, group: GridSize) -> Result<(GridSize, GridSize)> {
        let max = self
            .max_threads_per_threadgroup
            .ok_or(ComputeError::MissingPipelineState)?;
        let grid = grid.validate("grid")?;
        let group = group.validate("threadgroup size")?;
        let threads = group.volume().unwrap_or(usize::MAX);
        if threads > max {
            return Err(ComputeError::InvalidDispatch(format!(
                "threadgroup size {group} has {threads} threads, the pipeline allows {max}"
            )));
        }
        if let Some(index) = self.required.first_missing(self.bound) {
            return Err(ComputeError::MissingBinding { index });
        }
        Ok((grid, group))
    }

    /// Close the pass.
    pub fn end_encoding(mut self) -> Result<()> {
        self.ended = true;
        unsafe { objc_bridge::send_instance::<(), ()>(self.object.as_ptr(), "endEncoding", ())? };
        Ok(())
    }
}

impl Drop for ComputeEncoder<'_, '_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        warn!("Compute encoder dropped without end_encoding; ending it now");
        if let Err(e) =
            unsafe { objc_bridge::send_instance::<(), ()>(self.object.as_ptr(), "endEncoding", ()) }
        {
            error!("Failed to end compute encoder: {e}");
        }
    }
}

fn check_index(index: usize) -> Result<()> {
    if index >= MAX_BUFFER_BINDINGS {
        return Err(ComputeError::InvalidBinding {
            index,
            max: MAX_BUFFER_BINDINGS,
        });
    }
    Ok(())
}
