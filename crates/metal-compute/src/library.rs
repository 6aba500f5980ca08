//! Function lookup in a compiled library.

use std::ptr::NonNull;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use objc_bridge::runtime::AnyObject;
use objc_bridge::{Owned, WrappedString};
use tracing::debug;

use crate::error::{ComputeError, Result};
use crate::handle::{array_items, Function, Library};

impl<'a> Library<'a> {
    /// Look up a kernel entry point by name.
    pub fn new_function(&self, name: &str) -> Result<Function<'a>> {
        let wrapped = WrappedString::from_utf8_str(name)?;
        let function: *mut AnyObject =
            unsafe { self.send("newFunctionWithName:", (wrapped.as_object(),))? };
        match unsafe { Owned::from_created(function) } {
            Some(function) => {
                debug!(name, "function found");
                Ok(Function::adopt(self.arena(), function))
            }
            None => Err(ComputeError::FunctionNotFound {
                name: name.to_string(),
                available: self.function_names().unwrap_or_default(),
            }),
        }
    }

    /// Names of every function in the library.
    pub fn function_names(&self) -> Result<Vec<String>> {
        let names = unsafe { array_items(self.as_ptr(), "functionNames")? };
        names
            .into_iter()
            .map(|name| Ok(unsafe { objc_bridge::string_from_object(name)? }))
            .collect()
    }
}

/// `MTLFunctionType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum FunctionType {
    Vertex = 1,
    Fragment = 2,
    Kernel = 3,
    Visible = 5,
    Intersection = 6,
    Mesh = 7,
    Object = 8,
}

impl Function<'_> {
    pub fn name(&self) -> Result<String> {
        let name: *mut AnyObject = unsafe { self.send("name", ())? };
        let name = NonNull::new(name).ok_or(ComputeError::NullObject { what: "name" })?;
        Ok(unsafe { objc_bridge::string_from_object(name)? })
    }

    /// The kind of entry point. `None` for values this crate does not know.
    pub fn function_type(&self) -> Result<Option<FunctionType>> {
        let raw: usize = unsafe { self.send("functionType", ())? };
        Ok(FunctionType::from_usize(raw))
    }
}
