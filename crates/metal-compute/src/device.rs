//! Device creation and the objects a device makes: queues, libraries,
//! pipeline states and buffers.

use std::ptr;

use objc2::rc::Retained;
use objc_bridge::runtime::AnyObject;
use objc_bridge::{Owned, WrappedString};
use tracing::{debug, info, warn};

use crate::arena::ObjectArena;
use crate::buffer::Buffer;
use crate::bytes::{slice_as_bytes, Element};
use crate::error::{ComputeError, Result};
use crate::handle::{describe_error, CommandQueue, Device, Function, Library, PipelineState};
use crate::library::FunctionType;
use crate::options::{CompileOptions, StorageMode};
use crate::pipeline::{reflected_buffer_slots, PIPELINE_OPTION_BINDING_INFO};
use crate::slots::BufferSlots;

impl<'a> Device<'a> {
    /// The system default GPU.
    pub fn system_default(arena: &'a ObjectArena) -> Result<Self> {
        let device = objc2_metal::MTLCreateSystemDefaultDevice().ok_or(ComputeError::NoDevice)?;
        let raw = Retained::into_raw(device).cast::<AnyObject>();
        // Create rule: the reference is ours.
        let device = unsafe { Owned::from_created(raw) }.ok_or(ComputeError::NoDevice)?;
        let device = Self::adopt(arena, device);
        info!(device = ?device, name = %device.name().unwrap_or_default(), "Metal device created");
        Ok(device)
    }

    /// The device's marketing name, e.g. "Apple M2".
    pub fn name(&self) -> Result<String> {
        let name: *mut AnyObject = unsafe { self.send("name", ())? };
        let name = ptr::NonNull::new(name).ok_or(ComputeError::NullObject { what: "name" })?;
        Ok(unsafe { objc_bridge::string_from_object(name)? })
    }

    /// Largest buffer the device can allocate, in bytes.
    pub fn max_buffer_length(&self) -> Result<usize> {
        unsafe { self.send("maxBufferLength", ()) }
    }

    pub fn new_command_queue(&self) -> Result<CommandQueue<'a>> {
        let queue: *mut AnyObject = unsafe { self.send("newCommandQueue", ())? };
        let queue = unsafe { Owned::from_created(queue) }.ok_or(ComputeError::NullObject {
            what: "newCommandQueue",
        })?;
        Ok(CommandQueue::adopt(self.arena(), queue))
    }

    /// Compile MSL source at run time.
    ///
    /// On failure the compiler's diagnostic is returned in
    /// [`ComputeError::Compile`]. Warnings reported alongside a successful
    /// compile are logged.
    pub fn new_library_with_source(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<Library<'a>> {
        let source = WrappedString::from_utf8_str(source)?;
        let options = options.to_foreign()?;

        let mut error: *mut AnyObject = ptr::null_mut();
        let library: *mut AnyObject = unsafe {
            self.send(
                "newLibraryWithSource:options:error:",
                (
                    source.as_object(),
                    options.as_object(),
                    &mut error as *mut *mut AnyObject,
                ),
            )?
        };

        let Some(library) = (unsafe { Owned::from_created(library) }) else {
            let diagnostic = unsafe { describe_error(error) };
            return Err(ComputeError::Compile { diagnostic });
        };
        if !error.is_null() {
            warn!("Kernel compiled with warnings: {}", unsafe { describe_error(error) });
        }
        debug!(bytes = source.len(), "library compiled from source");
        Ok(Library::adopt(self.arena(), library))
    }

    /// The `default.metallib` in the main bundle.
    pub fn new_default_library(&self) -> Result<Library<'a>> {
        let library: *mut AnyObject = unsafe { self.send("newDefaultLibrary", ())? };
        let library = unsafe { Owned::from_created(library) }.ok_or(ComputeError::Compile {
            diagnostic: "no default library in the main bundle".into(),
        })?;
        Ok(Library::adopt(self.arena(), library))
    }

    /// Load a precompiled `.metallib`.
    pub fn new_library_with_data(&self, bytes: &[u8]) -> Result<Library<'a>> {
        let data = dispatch2::DispatchData::from_bytes(bytes);
        let data: *const AnyObject = (&*data as *const dispatch2::DispatchData).cast();

        let mut error: *mut AnyObject = ptr::null_mut();
        let library: *mut AnyObject = unsafe {
            self.send(
                "newLibraryWithData:error:",
                (data, &mut error as *mut *mut AnyObject),
            )?
        };
        let library = unsafe { Owned::from_created(library) }.ok_or_else(|| {
            ComputeError::Compile {
                diagnostic: unsafe { describe_error(error) },
            }
        })?;
        Ok(Library::adopt(self.arena(), library))
    }

    /// Build a pipeline state for a kernel function and record the buffer
    /// slots it uses.
    pub fn new_compute_pipeline_state(&self, function: &Function<'_>) -> Result<PipelineState<'a>> {
        let name = || function.name().unwrap_or_else(|_| "<unnamed>".into());
        match function.function_type()? {
            Some(FunctionType::Kernel) => {}
            other => {
                return Err(ComputeError::PipelineState {
                    function: name(),
                    diagnostic: format!("not a kernel function (type {other:?})"),
                })
            }
        }

        let mut reflection: *mut AnyObject = ptr::null_mut();
        let mut error: *mut AnyObject = ptr::null_mut();
        let state: *mut AnyObject = unsafe {
            self.send(
                "newComputePipelineStateWithFunction:options:reflection:error:",
                (
                    function.as_object(),
                    PIPELINE_OPTION_BINDING_INFO,
                    &mut reflection as *mut *mut AnyObject,
                    &mut error as *mut *mut AnyObject,
                ),
            )?
        };
        let state = unsafe { Owned::from_created(state) }.ok_or_else(|| {
            ComputeError::PipelineState {
                function: name(),
                diagnostic: unsafe { describe_error(error) },
            }
        })?;
        let buffer_slots = match ptr::NonNull::new(reflection) {
            Some(reflection) => unsafe { reflected_buffer_slots(reflection)? },
            None => {
                warn!(function = %name(), "no pipeline reflection; buffer bindings are not checked");
                BufferSlots::new()
            }
        };
        debug!(function = %name(), ?buffer_slots, "pipeline state created");
        let mut pipeline = PipelineState::adopt(self.arena(), state);
        pipeline.buffer_slots = buffer_slots;
        Ok(pipeline)
    }

    /// Allocate an uninitialized buffer of `length` bytes.
    pub fn new_buffer(&self, length: usize, storage: StorageMode) -> Result<Buffer<'a>> {
        if length == 0 {
            return Err(ComputeError::EmptyBuffer);
        }
        let buffer: *mut AnyObject = unsafe {
            self.send(
                "newBufferWithLength:options:",
                (length, storage.resource_options()),
            )?
        };
        let buffer = unsafe { Owned::from_created(buffer) }
            .ok_or(ComputeError::BufferAllocation { length })?;
        debug!(length, ?storage, "buffer allocated");
        Ok(Buffer::adopt(self.arena(), buffer, length, storage))
    }

    /// Allocate a buffer initialized with a copy of `values`.
    pub fn new_buffer_with_data<T: Element>(
        &self,
        values: &[T],
        storage: StorageMode,
    ) -> Result<Buffer<'a>> {
        let bytes = slice_as_bytes(values);
        if bytes.is_empty() {
            return Err(ComputeError::EmptyBuffer);
        }
        let buffer: *mut AnyObject = unsafe {
            self.send(
                "newBufferWithBytes:length:options:",
                (
                    bytes.as_ptr().cast::<std::ffi::c_void>(),
                    bytes.len(),
                    storage.resource_options(),
                ),
            )?
        };
        let buffer = unsafe { Owned::from_created(buffer) }.ok_or(
            ComputeError::BufferAllocation {
                length: bytes.len(),
            },
        )?;
        debug!(length = bytes.len(), ?storage, "buffer allocated with data");
        Ok(Buffer::adopt(self.arena(), buffer, bytes.len(), storage))
    }
}
