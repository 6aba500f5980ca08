//! Passing text across the runtime boundary.
//!
//! Kernel source and function names are handed to the runtime as `NSString`
//! objects that view the caller's bytes in place
//! (`initWithBytesNoCopy:length:encoding:freeWhenDone:` with `freeWhenDone`
//! off). The string object is ours and is released on drop; the bytes stay
//! the caller's and are borrowed for as long as the string exists.

use std::ffi::{c_char, c_void, CStr};
use std::marker::PhantomData;
use std::ptr::NonNull;

use objc2::runtime::{AnyObject, Bool};

use crate::dispatch::{send_class, send_instance};
use crate::error::{BridgeError, Result};
use crate::lifetime::{release, Owned};

/// `NSUTF8StringEncoding`.
const UTF8_STRING_ENCODING: usize = 4;

/// A foreign string object viewing borrowed UTF-8 bytes.
pub struct WrappedString<'b> {
    object: Owned,
    len: usize,
    _bytes: PhantomData<&'b [u8]>,
}

impl<'b> WrappedString<'b> {
    /// Wrap `bytes` without copying them.
    ///
    /// The bytes must be valid UTF-8; they cannot be modified or freed while
    /// the returned value is alive, which the borrow enforces.
    pub fn new(bytes: &'b [u8]) -> Result<Self> {
        std::str::from_utf8(bytes)?;

        let allocated: *mut AnyObject = unsafe { send_class("NSString", "alloc", ())? };
        let allocated = NonNull::new(allocated).ok_or_else(|| BridgeError::nil_object("alloc"))?;

        // The initializer consumes the allocation whether or not it succeeds.
        let initialized: Result<*mut AnyObject> = unsafe {
            send_instance(
                allocated,
                "initWithBytesNoCopy:length:encoding:freeWhenDone:",
                (
                    bytes.as_ptr() as *mut c_void,
                    bytes.len(),
                    UTF8_STRING_ENCODING,
                    Bool::NO,
                ),
            )
        };
        let initialized = match initialized {
            Ok(ptr) => ptr,
            Err(e) => {
                // Never sent, so the allocation is still ours.
                unsafe { release(allocated)? };
                return Err(e);
            }
        };

        let object = unsafe { Owned::from_created(initialized) }
            .ok_or(BridgeError::StringWrap(bytes.len()))?;
        Ok(Self {
            object,
            len: bytes.len(),
            _bytes: PhantomData,
        })
    }

    /// Wrap a string slice without copying it.
    pub fn from_utf8_str(text: &'b str) -> Result<Self> {
        Self::new(text.as_bytes())
    }

    pub fn as_object(&self) -> &AnyObject {
        self.object.as_object()
    }

    pub fn as_ptr(&self) -> NonNull<AnyObject> {
        self.object.as_ptr()
    }

    /// Length of the viewed bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Copy a foreign string's contents into a Rust `String`.
///
/// # Safety
/// `object` must be a live `NSString` (or subclass).
pub unsafe fn string_from_object(object: NonNull<AnyObject>) -> Result<String> {
    let utf8: *const c_char = unsafe { send_instance(object, "UTF8String", ())? };
    if utf8.is_null() {
        return Err(BridgeError::nil_object("UTF8String"));
    }
    // The buffer lives at least as long as the autorelease pool around us.
    Ok(unsafe { CStr::from_ptr(utf8) }.to_string_lossy().into_owned())
}
