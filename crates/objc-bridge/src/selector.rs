//! Method identifiers.
//!
//! A selector is the exact method name the target framework declares, e.g.
//! `newBufferWithLength:options:`. A typo resolves to nothing at run time, so
//! names are checked for shape here and for existence by the dispatcher.

use std::ffi::{CStr, CString};
use std::fmt;

use crate::error::{BridgeError, Result};

/// A validated selector name together with its arity.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    name: CString,
    arity: usize,
}

impl Selector {
    /// Parse a selector name.
    ///
    /// Unary selectors are plain identifiers (`commit`). Keyword selectors
    /// consist of one or more `part:` segments and must end with a colon
    /// (`setBuffer:offset:atIndex:`). The arity is the number of colons.
    pub fn new(name: &str) -> Result<Self> {
        let invalid = |reason| BridgeError::InvalidSelector {
            name: name.to_string(),
            reason,
        };

        let first = name.chars().next().ok_or_else(|| invalid("empty name"))?;
        if first == ':' || first.is_ascii_digit() {
            return Err(invalid("must start with a letter or underscore"));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == ':'))
        {
            return Err(BridgeError::InvalidSelector {
                name: name.to_string(),
                reason: if bad == '\0' {
                    "contains a NUL byte"
                } else {
                    "contains a character outside [A-Za-z0-9_:]"
                },
            });
        }

        let arity = name.matches(':').count();
        if arity > 0 && !name.ends_with(':') {
            return Err(invalid("keyword selectors must end with ':'"));
        }
        if name.contains("::") {
            return Err(invalid("empty keyword segment"));
        }

        let name = CString::new(name).map_err(|_| invalid("contains a NUL byte"))?;
        Ok(Self { name, arity })
    }

    pub fn name(&self) -> &str {
        // Validated as ASCII in `new`.
        self.name.to_str().unwrap_or_default()
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.name
    }

    /// Number of explicit arguments the method takes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Register (or look up) the selector with the runtime.
    #[cfg(target_os = "macos")]
    pub(crate) fn resolve(&self) -> objc2::runtime::Sel {
        objc2::runtime::Sel::register(&self.name)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self.name())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validate an Objective-C class name and convert it for the runtime.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn class_name(name: &str) -> Result<CString> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(BridgeError::InvalidClassName(name.to_string()));
    }
    CString::new(name).map_err(|_| BridgeError::InvalidClassName(name.to_string()))
}
