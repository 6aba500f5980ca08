//! Dynamic Objective-C message dispatch.
//!
//! This crate is the untyped layer underneath `metal-compute`: it resolves
//! selectors and classes by name at run time and sends messages with
//! caller-chosen argument and return types, without any compile-time binding
//! to the target framework's declarations.
//!
//! - [`Selector`] parses and validates a method name (available everywhere).
//! - [`dispatch`] sends a message to an instance or a named class.
//! - [`lifetime`] holds the retain/release helpers and the scoped [`Owned`]
//!   reference.
//! - [`string`] wraps caller-owned bytes as a foreign string without copying.
//!
//! Everything that talks to the runtime is only compiled on macOS.

pub mod error;
pub mod selector;

pub use error::{BridgeError, Result};
pub use selector::Selector;

// Runtime-backed modules.

#[cfg(target_os = "macos")]
pub mod dispatch;
#[cfg(target_os = "macos")]
pub mod lifetime;
#[cfg(target_os = "macos")]
pub mod string;

#[cfg(target_os = "macos")]
pub use dispatch::{send_class, send_instance, Receiver};
#[cfg(target_os = "macos")]
pub use lifetime::{release, retain, retain_count, Owned};
#[cfg(target_os = "macos")]
pub use string::{string_from_object, WrappedString};

/// Raw object and class types, re-exported so consumers name the same
/// runtime types as the dispatcher.
#[cfg(target_os = "macos")]
pub mod runtime {
    pub use objc2::encode::{EncodeArguments, EncodeReturn};
    pub use objc2::runtime::{AnyClass, AnyObject, Bool};
}
