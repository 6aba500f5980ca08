//! Command buffer execution status.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Mirrors `MTLCommandBufferStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum CommandBufferStatus {
    NotEnqueued = 0,
    Enqueued = 1,
    Committed = 2,
    Scheduled = 3,
    Completed = 4,
    Error = 5,
}

impl CommandBufferStatus {
    pub fn from_raw(raw: usize) -> Option<Self> {
        Self::from_usize(raw)
    }

    /// The device has finished with the buffer, successfully or not.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}
