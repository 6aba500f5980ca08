//! The generic message-send primitive.
//!
//! Every cross-runtime call in the workspace goes through [`send`]. The
//! caller picks the argument tuple type and the return type; the runtime has
//! no way to check them against the method's real signature, so each call
//! site carries that contract. What *can* be checked is checked up front:
//! the class exists, the receiver implements the selector, and the number of
//! arguments matches the selector's arity.
//!
//! Selectors and classes are resolved on every call.

use std::fmt;
use std::ptr::NonNull;

use objc2::encode::{EncodeArguments, EncodeReturn};
use objc2::runtime::{AnyClass, AnyObject, MessageReceiver, Sel};
use tracing::trace;

use crate::error::{BridgeError, Result};
use crate::selector::{class_name, Selector};

/// The target of a message send.
#[derive(Clone, Copy)]
pub enum Receiver<'r> {
    /// A live object; the method is looked up on its class.
    Instance(&'r AnyObject),
    /// A class, for factory methods such as `alloc` and `new`.
    Class(&'static AnyClass),
}

impl<'r> Receiver<'r> {
    /// Receiver for a live object.
    ///
    /// # Safety
    /// `object` must point to a valid object that stays alive for `'r`.
    pub unsafe fn instance(object: NonNull<AnyObject>) -> Self {
        Receiver::Instance(unsafe { object.as_ref() })
    }

    /// Resolve a class by name.
    pub fn class(name: &str) -> Result<Receiver<'static>> {
        let c_name = class_name(name)?;
        AnyClass::get(&c_name)
            .map(Receiver::Class)
            .ok_or_else(|| BridgeError::UnknownClass(name.to_string()))
    }

    fn responds_to(&self, sel: Sel) -> bool {
        match self {
            Receiver::Instance(object) => object.class().responds_to(sel),
            Receiver::Class(class) => class.metaclass().responds_to(sel),
        }
    }
}

impl fmt::Display for Receiver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Receiver::Instance(object) => {
                write!(f, "instance of {} at {:p}", object.class(), *object)
            }
            Receiver::Class(class) => write!(f, "class {class}"),
        }
    }
}

/// Send `selector` to `receiver` with `args`, returning `R`.
///
/// Fails without sending when the argument count differs from the selector's
/// arity ([`BridgeError::TypeContract`]) or the receiver does not implement
/// the selector ([`BridgeError::UnresolvedMethod`]).
///
/// # Safety
/// `A` and `R` must match the method's declared argument and return types
/// exactly, and any pointers in `args` must be valid for the callee's use.
/// Object results follow the runtime's ownership conventions; the caller
/// decides whether a returned object is +1 or +0.
pub unsafe fn send<A, R>(receiver: Receiver<'_>, selector: &Selector, args: A) -> Result<R>
where
    A: EncodeArguments,
    R: EncodeReturn,
{
    let supplied = A::ENCODINGS.len();
    if supplied != selector.arity() {
        return Err(BridgeError::TypeContract {
            selector: selector.name().to_string(),
            expected: selector.arity(),
            supplied,
        });
    }

    let sel = selector.resolve();
    if !receiver.responds_to(sel) {
        return Err(BridgeError::UnresolvedMethod {
            receiver: receiver.to_string(),
            selector: selector.name().to_string(),
        });
    }

    trace!(%receiver, %selector, "send");
    let value = match receiver {
        Receiver::Instance(object) => unsafe { object.send_message(sel, args) },
        Receiver::Class(class) => unsafe { class.send_message(sel, args) },
    };
    Ok(value)
}

/// Instance-call: parse `selector` and send it to `object`.
///
/// # Safety
/// See [`send`]; additionally `object` must be a live object.
pub unsafe fn send_instance<A, R>(object: NonNull<AnyObject>, selector: &str, args: A) -> Result<R>
where
    A: EncodeArguments,
    R: EncodeReturn,
{
    let selector = Selector::new(selector)?;
    unsafe { send(Receiver::instance(object), &selector, args) }
}

/// Class-call: resolve `class` by name and send it `selector`.
///
/// # Safety
/// See [`send`].
pub unsafe fn send_class<A, R>(class: &str, selector: &str, args: A) -> Result<R>
where
    A: EncodeArguments,
    R: EncodeReturn,
{
    let selector = Selector::new(selector)?;
    let receiver = Receiver::class(class)?;
    unsafe { send(receiver, &selector, args) }
}
