//! Dispatch shapes.

use std::fmt;

use crate::error::{ComputeError, Result};

/// A three-axis extent: a threadgroup count or a threadgroup size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl GridSize {
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// One-dimensional extent; the Y and Z axes are fixed to 1.
    pub const fn linear(width: usize) -> Self {
        Self::new(width, 1, 1)
    }

    /// Product of the three axes, or `None` on overflow.
    pub fn volume(&self) -> Option<usize> {
        self.width.checked_mul(self.height)?.checked_mul(self.depth)
    }

    /// Check that every axis is non-zero and the volume is representable.
    /// `what` names the extent in the error message.
    pub fn validate(self, what: &str) -> Result<Self> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(ComputeError::InvalidDispatch(format!(
                "{what} {self} has a zero axis"
            )));
        }
        if self.volume().is_none() {
            return Err(ComputeError::InvalidDispatch(format!(
                "{what} {self} overflows"
            )));
        }
        Ok(self)
    }

    /// Number of threadgroups of `threads_per_threadgroup` threads needed to
    /// cover `elements` one-dimensional work items exactly.
    pub fn covering(elements: usize, threads_per_threadgroup: usize) -> Result<usize> {
        if elements == 0 {
            return Err(ComputeError::InvalidDispatch("no elements to process".into()));
        }
        if threads_per_threadgroup == 0 {
            return Err(ComputeError::InvalidDispatch(
                "threads per threadgroup must be non-zero".into(),
            ));
        }
        if elements % threads_per_threadgroup != 0 {
            return Err(ComputeError::InvalidDispatch(format!(
                "{elements} elements are not a multiple of the threadgroup size {threads_per_threadgroup}"
            )));
        }
        Ok(elements / threads_per_threadgroup)
    }
}

impl From<usize> for GridSize {
    fn from(width: usize) -> Self {
        Self::linear(width)
    }
}

impl From<(usize, usize, usize)> for GridSize {
    fn from((width, height, depth): (usize, usize, usize)) -> Self {
        Self::new(width, height, depth)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

#[cfg(target_os = "macos")]
impl From<GridSize> for objc2_metal::MTLSize {
    fn from(size: GridSize) -> Self {
        objc2_metal::MTLSize {
            width: size.width,
            height: size.height,
            depth: size.depth,
        }
    }
}
