//! Owner of the long-lived foreign objects of one compute session.

use std::cell::RefCell;
use std::ptr::NonNull;

use objc_bridge::runtime::AnyObject;
use objc_bridge::Owned;
use tracing::debug;

/// Holds one reference to every device, queue, library, function and
/// pipeline state created through it. Handles borrow the arena, so none can
/// outlive it; on drop the objects are released newest first.
///
/// Not `Sync`: a session lives on one thread.
#[derive(Default)]
pub struct ObjectArena {
    objects: RefCell<Vec<Owned>>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `object` and return its pointer, valid until the
    /// arena is dropped.
    pub(crate) fn adopt(&self, object: Owned) -> NonNull<AnyObject> {
        let ptr = object.as_ptr();
        self.objects.borrow_mut().push(object);
        ptr
    }

    /// Number of objects currently owned.
    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl Drop for ObjectArena {
    fn drop(&mut self) {
        let objects = self.objects.get_mut();
        debug!(count = objects.len(), "releasing arena objects");
        while let Some(object) = objects.pop() {
            drop(object);
        }
    }
}

impl std::fmt::Debug for ObjectArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectArena").field("objects", &self.len()).finish()
    }
}
