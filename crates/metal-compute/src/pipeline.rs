//! Pipeline state limits and the buffer slots a kernel reads.

use std::ptr::NonNull;

use objc_bridge::runtime::{AnyObject, Bool};
use objc_bridge::BridgeError;

use crate::error::{ComputeError, Result};
use crate::handle::{array_items, PipelineState};
use crate::slots::BufferSlots;

/// `MTLPipelineOptionBindingInfo`, formerly `ArgumentInfo`.
pub(crate) const PIPELINE_OPTION_BINDING_INFO: usize = 1;

impl PipelineState<'_> {
    /// Upper bound on the threads of one threadgroup for this kernel.
    pub fn max_total_threads_per_threadgroup(&self) -> Result<usize> {
        unsafe { self.send("maxTotalThreadsPerThreadgroup", ()) }
    }

    /// SIMD group width; threadgroup sizes should be a multiple of it.
    pub fn thread_execution_width(&self) -> Result<usize> {
        unsafe { self.send("threadExecutionWidth", ()) }
    }

    /// Buffer slots the kernel uses. Each must be bound before a dispatch.
    pub fn buffer_slots(&self) -> BufferSlots {
        self.buffer_slots
    }
}

/// Collect the used buffer slots from an `MTLComputePipelineReflection`.
///
/// Newer runtimes describe arguments as `bindings`; older ones only have
/// `arguments`.
///
/// # Safety
/// `reflection` must be a live pipeline reflection object.
pub(crate) unsafe fn reflected_buffer_slots(reflection: NonNull<AnyObject>) -> Result<BufferSlots> {
    match unsafe { array_items(reflection, "bindings") } {
        Ok(bindings) => bindings
            .into_iter()
            .filter_map(|binding| unsafe { used_buffer_binding(binding) }.transpose())
            .collect(),
        Err(ComputeError::Bridge(BridgeError::UnresolvedMethod { .. })) => {
            unsafe { array_items(reflection, "arguments")? }
                .into_iter()
                .filter_map(|argument| unsafe { active_buffer_argument(argument) }.transpose())
                .collect()
        }
        Err(e) => Err(e),
    }
}

// MTLBindingType is signed; MTLBindingTypeBuffer = 0.
unsafe fn used_buffer_binding(binding: NonNull<AnyObject>) -> Result<Option<usize>> {
    let kind: isize = unsafe { objc_bridge::send_instance(binding, "type", ())? };
    let used: Bool = unsafe { objc_bridge::send_instance(binding, "isUsed", ())? };
    if kind != 0 || !used.as_bool() {
        return Ok(None);
    }
    Ok(Some(unsafe { objc_bridge::send_instance(binding, "index", ())? }))
}

// MTLArgumentType is unsigned; MTLArgumentTypeBuffer = 0.
unsafe fn active_buffer_argument(argument: NonNull<AnyObject>) -> Result<Option<usize>> {
    let kind: usize = unsafe { objc_bridge::send_instance(argument, "type", ())? };
    let active: Bool = unsafe { objc_bridge::send_instance(argument, "isActive", ())? };
    if kind != 0 || !active.as_bool() {
        return Ok(None);
    }
    Ok(Some(unsafe { objc_bridge::send_instance(argument, "index", ())? }))
}
