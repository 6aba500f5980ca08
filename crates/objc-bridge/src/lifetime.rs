//! Reference counting of foreign objects.
//!
//! The bridge follows the runtime's manual rules: an object returned by an
//! `alloc`/`new`/`copy` method or a create-rule C function arrives at +1 and
//! must be released once; anything else arrives at +0 and must be retained to
//! be kept. [`Owned`] is that single +1 reference, released on drop.

use std::fmt;
use std::ptr::NonNull;

use objc2::runtime::AnyObject;
use tracing::{debug, error};

use crate::dispatch::send_instance;
use crate::error::{BridgeError, Result};

/// Send `release` to `object`.
///
/// # Safety
/// The caller must own one reference to `object` and must not use that
/// reference afterwards.
pub unsafe fn release(object: NonNull<AnyObject>) -> Result<()> {
    unsafe { send_instance::<(), ()>(object, "release", ()) }
}

/// Send `retain` to `object`, returning the (same) object at +1.
///
/// # Safety
/// `object` must be live.
pub unsafe fn retain(object: NonNull<AnyObject>) -> Result<NonNull<AnyObject>> {
    let retained: *mut AnyObject = unsafe { send_instance(object, "retain", ())? };
    NonNull::new(retained).ok_or_else(|| BridgeError::nil_object("retain"))
}

/// Current retain count. Diagnostic only: the runtime may report
/// arbitrary values for tagged or immortal objects.
///
/// # Safety
/// `object` must be live.
pub unsafe fn retain_count(object: NonNull<AnyObject>) -> Result<usize> {
    unsafe { send_instance(object, "retainCount", ()) }
}

/// One owned (+1) reference to a foreign object.
///
/// Dropping it sends `release` exactly once. There is no `Clone`: a second
/// reference must be obtained with [`Owned::retain`].
pub struct Owned {
    ptr: NonNull<AnyObject>,
}

impl Owned {
    /// Take ownership of a +1 result. Returns `None` for nil.
    ///
    /// # Safety
    /// `ptr` must be nil or a live object whose +1 reference the caller
    /// transfers to the returned value.
    pub unsafe fn from_created(ptr: *mut AnyObject) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Retain a +0 (borrowed or autoreleased) result. Returns `Ok(None)` for
    /// nil.
    ///
    /// # Safety
    /// `ptr` must be nil or a live object.
    pub unsafe fn retain(ptr: *mut AnyObject) -> Result<Option<Self>> {
        match NonNull::new(ptr) {
            Some(ptr) => {
                let ptr = unsafe { retain(ptr)? };
                Ok(Some(Self { ptr }))
            }
            None => Ok(None),
        }
    }

    pub fn as_ptr(&self) -> NonNull<AnyObject> {
        self.ptr
    }

    pub fn as_object(&self) -> &AnyObject {
        // Live for as long as this reference is held.
        unsafe { self.ptr.as_ref() }
    }

    /// Give up the reference without releasing it.
    pub fn into_raw(self) -> NonNull<AnyObject> {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }
}

impl Drop for Owned {
    fn drop(&mut self) {
        debug!(object = ?self.ptr, "release");
        if let Err(e) = unsafe { release(self.ptr) } {
            error!("Failed to release foreign object {:?}: {e}", self.ptr);
        }
    }
}

impl fmt::Debug for Owned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owned({:p})", self.ptr)
    }
}
