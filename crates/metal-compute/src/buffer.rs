//! Device memory with checked CPU access.

use std::cell::Cell;
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use objc_bridge::runtime::AnyObject;
use objc_bridge::Owned;

use crate::arena::ObjectArena;
use crate::bytes::Element;
use crate::error::{ComputeError, Result};
use crate::options::StorageMode;

/// A `MTLBuffer` owned by an [`ObjectArena`].
///
/// Clones name the same buffer and share its in-flight count: the number of
/// committed command buffers that bind it and have not been waited on.
/// Mapped reads and writes are refused while that count is non-zero.
#[derive(Clone)]
pub struct Buffer<'a> {
    raw: NonNull<AnyObject>,
    arena: &'a ObjectArena,
    length: usize,
    storage: StorageMode,
    in_flight: Rc<Cell<usize>>,
}

impl<'a> Buffer<'a> {
    pub(crate) fn adopt(
        arena: &'a ObjectArena,
        object: Owned,
        length: usize,
        storage: StorageMode,
    ) -> Self {
        Self {
            raw: arena.adopt(object),
            arena,
            length,
            storage,
            in_flight: Rc::new(Cell::new(0)),
        }
    }

    pub fn arena(&self) -> &'a ObjectArena {
        self.arena
    }

    pub fn as_ptr(&self) -> NonNull<AnyObject> {
        self.raw
    }

    pub fn as_object(&self) -> &'a AnyObject {
        unsafe { self.raw.as_ref() }
    }

    /// Size in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get() > 0
    }

    pub(crate) fn in_flight_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.in_flight)
    }

    /// Base address of the CPU mapping. Refused while the buffer is in
    /// flight.
    pub fn contents(&self) -> Result<NonNull<c_void>> {
        if self.is_in_flight() {
            return Err(ComputeError::BufferInFlight);
        }
        if !self.storage.is_cpu_visible() {
            return Err(ComputeError::StorageNotMapped);
        }
        let contents: *mut c_void = unsafe { objc_bridge::send_instance(self.raw, "contents", ())? };
        NonNull::new(contents).ok_or(ComputeError::NullObject { what: "contents" })
    }

    /// Copy the whole buffer out as elements of `T`.
    pub fn read<T: Element>(&self) -> Result<Vec<T>> {
        let contents = self.mapped::<T>()?;
        let count = self.length / std::mem::size_of::<T>();
        let values = unsafe { std::slice::from_raw_parts(contents.as_ptr(), count) };
        Ok(values.to_vec())
    }

    /// Copy `values` to the start of the buffer.
    pub fn write<T: Element>(&self, values: &[T]) -> Result<()> {
        let size = std::mem::size_of_val(values);
        if size > self.length {
            return Err(ComputeError::BufferOverflow {
                size,
                length: self.length,
            });
        }
        let contents = self.mapped::<T>()?;
        unsafe {
            std::ptr::copy_nonoverlapping(values.as_ptr(), contents.as_ptr(), values.len());
        }
        Ok(())
    }

    fn mapped<T: Element>(&self) -> Result<NonNull<T>> {
        let element = std::mem::size_of::<T>();
        if element == 0 || self.length % element != 0 {
            return Err(ComputeError::ElementLayout {
                length: self.length,
                element,
            });
        }
        let contents = self.contents()?.cast::<T>();
        if contents.as_ptr().align_offset(std::mem::align_of::<T>()) != 0 {
            return Err(ComputeError::ElementLayout {
                length: self.length,
                element,
            });
        }
        Ok(contents)
    }
}

impl fmt::Debug for Buffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("object", &self.raw)
            .field("length", &self.length)
            .field("storage", &self.storage)
            .field("in_flight", &self.in_flight.get())
            .finish()
    }
}
