//! Command buffers: record, commit, wait.
//!
//! The lifecycle is encoded in the types. A [`CommandBuffer`] records
//! encoders; [`CommandBuffer::commit`] consumes it and returns a
//! [`CommittedCommandBuffer`], which can only be waited on. Buffers bound
//! while recording are marked in flight from commit until the wait returns.

use std::cell::Cell;
use std::rc::Rc;

use objc_bridge::runtime::AnyObject;
use objc_bridge::Owned;
use tracing::{debug, error, warn};

use crate::buffer::Buffer;
use crate::encoder::ComputeEncoder;
use crate::error::{ComputeError, Result};
use crate::handle::{describe_error, CommandQueue};
use crate::status::CommandBufferStatus;

impl<'a> CommandQueue<'a> {
    /// Create a command buffer for recording.
    pub fn command_buffer(&self) -> Result<CommandBuffer<'a>> {
        let buffer: *mut AnyObject = unsafe { self.send("commandBuffer", ())? };
        // Autoreleased; keep our own reference.
        let object = unsafe { Owned::retain(buffer)? }.ok_or(ComputeError::NullObject {
            what: "commandBuffer",
        })?;
        Ok(CommandBuffer {
            object,
            queue: *self,
            bound: Vec::new(),
        })
    }
}

/// A command buffer that is still recording.
pub struct CommandBuffer<'a> {
    object: Owned,
    queue: CommandQueue<'a>,
    bound: Vec<Rc<Cell<usize>>>,
}

impl<'a> CommandBuffer<'a> {
    pub fn queue(&self) -> CommandQueue<'a> {
        self.queue
    }

    /// Start a compute pass. The buffer cannot be committed or used for
    /// another pass until the encoder is ended.
    pub fn compute_encoder(&mut self) -> Result<ComputeEncoder<'_, 'a>> {
        let encoder: *mut AnyObject = unsafe {
            objc_bridge::send_instance(self.object.as_ptr(), "computeCommandEncoder", ())?
        };
        let encoder = unsafe { Owned::retain(encoder)? }.ok_or(ComputeError::NullObject {
            what: "computeCommandEncoder",
        })?;
        Ok(ComputeEncoder::new(encoder, self))
    }

    /// Remember that `buffer` is referenced by this command buffer.
    pub(crate) fn track(&mut self, buffer: &Buffer<'_>) {
        let counter = buffer.in_flight_counter();
        if !self.bound.iter().any(|c| Rc::ptr_eq(c, &counter)) {
            self.bound.push(counter);
        }
    }

    /// Submit for execution.
    pub fn commit(self) -> Result<CommittedCommandBuffer<'a>> {
        unsafe { objc_bridge::send_instance::<(), ()>(self.object.as_ptr(), "commit", ())? };
        for counter in &self.bound {
            counter.set(counter.get() + 1);
        }
        debug!(object = ?self.object, buffers = self.bound.len(), "command buffer committed");
        Ok(CommittedCommandBuffer {
            object: self.object,
            queue: self.queue,
            bound: self.bound,
            waited: false,
        })
    }
}

/// A submitted command buffer. Dropping it without waiting blocks until the
/// device is done with it.
pub struct CommittedCommandBuffer<'a> {
    object: Owned,
    queue: CommandQueue<'a>,
    bound: Vec<Rc<Cell<usize>>>,
    waited: bool,
}

impl<'a> CommittedCommandBuffer<'a> {
    pub fn queue(&self) -> CommandQueue<'a> {
        self.queue
    }

    pub fn status(&self) -> Result<CommandBufferStatus> {
        let raw: usize = unsafe { objc_bridge::send_instance(self.object.as_ptr(), "status", ())? };
        CommandBufferStatus::from_raw(raw).ok_or(ComputeError::UnknownStatus(raw))
    }

    /// Block until the device has executed the buffer, then release the
    /// bound buffers for CPU access.
    ///
    /// Returns [`ComputeError::CommandBufferFailed`] if execution did not
    /// complete successfully.
    pub fn wait_until_completed(mut self) -> Result<()> {
        self.finish()?;
        match self.status()? {
            CommandBufferStatus::Completed => Ok(()),
            status => {
                let error: *mut AnyObject =
                    unsafe { objc_bridge::send_instance(self.object.as_ptr(), "error", ())? };
                Err(ComputeError::CommandBufferFailed {
                    diagnostic: format!("{status:?}: {}", unsafe { describe_error(error) }),
                })
            }
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.waited {
            return Ok(());
        }
        unsafe {
            objc_bridge::send_instance::<(), ()>(self.object.as_ptr(), "waitUntilCompleted", ())?
        };
        self.waited = true;
        for counter in &self.bound {
            counter.set(counter.get().saturating_sub(1));
        }
        debug!(object = ?self.object, "command buffer finished");
        Ok(())
    }
}

impl Drop for CommittedCommandBuffer<'_> {
    fn drop(&mut self) {
        if self.waited {
            return;
        }
        warn!("Committed command buffer dropped without waiting; waiting now");
        if let Err(e) = self.finish() {
            error!("Failed to wait for command buffer: {e}");
        }
    }
}
