//! Byte views of plain data for buffer contents and inline parameters.

/// Convert a `#[repr(C)]` struct to a byte slice for inline kernel
/// parameters.
///
/// # Safety
///
/// Only implement on `#[repr(C)]` structs whose fields are all plain numeric
/// types (f32, i32, u32, etc.) with no pointers, references, or
/// padding-dependent invariants.
///
/// # Example
///
/// ```rust,ignore
/// #[repr(C)]
/// struct Affine {
///     scale: f32,
///     offset: f32,
/// }
///
/// unsafe impl AsBytes for Affine {}
///
/// encoder.set_value(&Affine { scale: 2.0, offset: 1.0 }, 1)?;
/// ```
pub unsafe trait AsBytes: Sized {
    /// View `self` as a byte slice. The returned slice has length
    /// `std::mem::size_of::<Self>()`.
    fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(self as *const Self as *const u8, std::mem::size_of::<Self>())
        }
    }
}

/// Element types that may be read from and written to mapped buffer memory.
///
/// # Safety
///
/// Every bit pattern of `size_of::<Self>()` bytes must be a valid value.
pub unsafe trait Element: Copy + 'static {}

macro_rules! plain_numeric {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Element for $ty {}
            unsafe impl AsBytes for $ty {}
        )*
    };
}

plain_numeric!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// View a slice of elements as raw bytes.
pub fn slice_as_bytes<T: Element>(values: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), std::mem::size_of_val(values)) }
}
