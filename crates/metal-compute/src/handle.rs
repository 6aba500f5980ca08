//! Arena-owned object handles.
//!
//! A handle is a copyable, non-null pointer to an object owned by an
//! [`ObjectArena`]. Handles borrow the arena, so the borrow checker keeps
//! them from outliving the objects they name. Methods on each handle live
//! next to the stage that uses them (`device.rs`, `library.rs`, ...).

use std::fmt;
use std::ptr::NonNull;

use objc_bridge::runtime::{AnyObject, EncodeArguments, EncodeReturn};
use objc_bridge::Owned;

use crate::arena::ObjectArena;
use crate::error::Result;
use crate::slots::BufferSlots;

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident $({ $($field:ident: $ty:ty),* $(,)? })?) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name<'a> {
            raw: NonNull<AnyObject>,
            arena: &'a ObjectArena,
            $($(pub(crate) $field: $ty,)*)?
        }

        impl<'a> $name<'a> {
            /// Move `object` into `arena` and return a handle to it. Extra
            /// fields start at their defaults.
            pub(crate) fn adopt(arena: &'a ObjectArena, object: Owned) -> Self {
                Self {
                    raw: arena.adopt(object),
                    arena,
                    $($($field: Default::default(),)*)?
                }
            }

            /// The arena that owns this object.
            pub fn arena(&self) -> &'a ObjectArena {
                self.arena
            }

            pub fn as_ptr(&self) -> NonNull<AnyObject> {
                self.raw
            }

            pub fn as_object(&self) -> &'a AnyObject {
                // Owned by the arena, which outlives 'a.
                unsafe { self.raw.as_ref() }
            }

            /// Send `selector` to the underlying object.
            ///
            /// # Safety
            /// Same contract as [`objc_bridge::send_instance`].
            pub(crate) unsafe fn send<A, R>(&self, selector: &str, args: A) -> Result<R>
            where
                A: EncodeArguments,
                R: EncodeReturn,
            {
                Ok(unsafe { objc_bridge::send_instance(self.raw, selector, args)? })
            }
        }

        impl fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:p})", stringify!($name), self.raw)
            }
        }

        impl PartialEq for $name<'_> {
            fn eq(&self, other: &Self) -> bool {
                self.raw == other.raw
            }
        }

        impl Eq for $name<'_> {}
    };
}

arena_handle!(
    /// A GPU (`MTLDevice`).
    Device
);
arena_handle!(
    /// A serial submission queue (`MTLCommandQueue`).
    CommandQueue
);
arena_handle!(
    /// A compiled kernel library (`MTLLibrary`).
    Library
);
arena_handle!(
    /// A kernel entry point (`MTLFunction`).
    Function
);
arena_handle!(
    /// A compute pipeline state (`MTLComputePipelineState`), with the buffer
    /// slots its kernel reads.
    PipelineState {
        buffer_slots: BufferSlots,
    }
);

/// Read an `NSError`'s `localizedDescription`. Never fails: a nil error or an
/// unreadable description yields a placeholder.
///
/// # Safety
/// `error` must be nil or a live `NSError`.
pub(crate) unsafe fn describe_error(error: *mut AnyObject) -> String {
    let Some(error) = NonNull::new(error) else {
        return "unknown error".to_string();
    };
    let description: Result<String> = (|| {
        let text: *mut AnyObject =
            unsafe { objc_bridge::send_instance(error, "localizedDescription", ())? };
        let text = NonNull::new(text).ok_or(crate::ComputeError::NullObject {
            what: "localizedDescription",
        })?;
        Ok(unsafe { objc_bridge::string_from_object(text)? })
    })();
    description.unwrap_or_else(|e| format!("unreadable error ({e})"))
}

/// The elements of the `NSArray` returned by sending `selector` to `object`.
/// The array is autoreleased; elements are only valid inside the current
/// pool.
///
/// # Safety
/// `object` must be live and `selector` must return an `NSArray`.
pub(crate) unsafe fn array_items(
    object: NonNull<AnyObject>,
    selector: &'static str,
) -> Result<Vec<NonNull<AnyObject>>> {
    let array: *mut AnyObject = unsafe { objc_bridge::send_instance(object, selector, ())? };
    let array = NonNull::new(array).ok_or(crate::ComputeError::NullObject { what: selector })?;
    let count: usize = unsafe { objc_bridge::send_instance(array, "count", ())? };
    (0..count)
        .map(|i| {
            let item: *mut AnyObject =
                unsafe { objc_bridge::send_instance(array, "objectAtIndex:", (i,))? };
            NonNull::new(item).ok_or(crate::ComputeError::NullObject {
                what: "objectAtIndex:",
            })
        })
        .collect()
}
