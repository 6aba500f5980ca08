//! Typed Metal compute on top of [`objc_bridge`].
//!
//! Every Metal object is reached through dynamic message sends; this crate
//! gives each object kind its own handle type so a library cannot be bound
//! where a buffer is expected, and encodes the command lifecycle in the types.
//!
//! # Overview
//!
//! - [`ObjectArena`] owns the long-lived objects of a session and releases
//!   them at teardown. [`Device`], [`CommandQueue`], [`Library`],
//!   [`Function`] and [`PipelineState`] are copyable handles into it.
//! - [`Buffer`] is device memory with checked, typed CPU access.
//! - [`CommandBuffer`] records [`ComputeEncoder`] passes; committing yields a
//!   [`CommittedCommandBuffer`] that can only be waited on.
//! - [`KernelSource`] accepts MSL, WGSL (translated with naga), precompiled
//!   metallibs or the bundled default library.
//! - [`ComputeJob`] runs the whole create, compile, encode, submit, read
//!   sequence and reports each [`Stage`].
//!
//! Types that talk to the runtime are only available on macOS.

pub mod bytes;
pub mod error;
pub mod grid;
pub mod job;
pub mod kernel;
pub mod options;
pub mod slots;
pub mod stage;
pub mod status;

#[cfg(target_os = "macos")]
pub mod arena;
#[cfg(target_os = "macos")]
pub mod buffer;
#[cfg(target_os = "macos")]
pub mod command;
#[cfg(target_os = "macos")]
mod device;
#[cfg(target_os = "macos")]
pub mod encoder;
#[cfg(target_os = "macos")]
pub mod handle;
#[cfg(target_os = "macos")]
pub mod library;
#[cfg(target_os = "macos")]
mod pipeline;

// Re-export primary types at crate root for convenience.
pub use bytes::{AsBytes, Element};
pub use error::{ComputeError, Result};
pub use grid::GridSize;
pub use job::{ComputeJob, DispatchForm, JobOutput, StageReport};
pub use kernel::{translate_wgsl, KernelSource, LibraryInput, PreparedKernel, TranslatedKernel};
pub use options::{CompileOptions, StorageMode};
pub use slots::{BufferSlots, MAX_BUFFER_BINDINGS};
pub use stage::{Stage, StageContext, StageError};
pub use status::CommandBufferStatus;

#[cfg(target_os = "macos")]
pub use arena::ObjectArena;
#[cfg(target_os = "macos")]
pub use buffer::Buffer;
#[cfg(target_os = "macos")]
pub use command::{CommandBuffer, CommittedCommandBuffer};
#[cfg(target_os = "macos")]
pub use encoder::{ComputeEncoder, MAX_INLINE_BYTES};
#[cfg(target_os = "macos")]
pub use handle::{CommandQueue, Device, Function, Library, PipelineState};
#[cfg(target_os = "macos")]
pub use library::FunctionType;
