//! Compile and allocation options.

/// Options for compiling kernel source at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Relax floating-point precision guarantees for speed.
    pub fast_math_enabled: bool,
}

impl Default for CompileOptions {
    /// Fast math on, as the Metal compiler defaults to.
    fn default() -> Self {
        Self {
            fast_math_enabled: true,
        }
    }
}

impl CompileOptions {
    pub fn with_fast_math(mut self, enabled: bool) -> Self {
        self.fast_math_enabled = enabled;
        self
    }

    /// Build a transient `MTLCompileOptions` object carrying these options.
    /// The returned reference is released when dropped.
    #[cfg(target_os = "macos")]
    pub(crate) fn to_foreign(self) -> crate::Result<objc_bridge::Owned> {
        use objc_bridge::runtime::{AnyObject, Bool};

        let options: *mut AnyObject =
            unsafe { objc_bridge::send_class("MTLCompileOptions", "new", ())? };
        let options = unsafe { objc_bridge::Owned::from_created(options) }.ok_or(
            crate::ComputeError::NullObject {
                what: "MTLCompileOptions new",
            },
        )?;
        unsafe {
            objc_bridge::send_instance::<_, ()>(
                options.as_ptr(),
                "setFastMathEnabled:",
                (Bool::new(self.fast_math_enabled),),
            )?;
        }
        Ok(options)
    }
}

/// Where a buffer's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// System memory visible to both CPU and GPU. Mapped access allowed.
    #[default]
    Shared,
    /// GPU-only memory. No mapped access.
    Private,
}

impl StorageMode {
    pub fn is_cpu_visible(self) -> bool {
        matches!(self, StorageMode::Shared)
    }

    #[cfg(target_os = "macos")]
    pub(crate) fn resource_options(self) -> objc2_metal::MTLResourceOptions {
        use objc2_metal::MTLResourceOptions;

        match self {
            StorageMode::Shared => MTLResourceOptions::StorageModeShared,
            StorageMode::Private => MTLResourceOptions::StorageModePrivate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_math_defaults_on() {
        assert!(CompileOptions::default().fast_math_enabled);
        assert!(!CompileOptions::default().with_fast_math(false).fast_math_enabled);
    }

    #[test]
    fn only_shared_storage_is_mapped() {
        assert_eq!(StorageMode::default(), StorageMode::Shared);
        assert!(StorageMode::Shared.is_cpu_visible());
        assert!(!StorageMode::Private.is_cpu_visible());
    }
}
