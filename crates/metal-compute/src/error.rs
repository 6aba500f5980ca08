//! Error type shared by every operation in this crate.

use objc_bridge::BridgeError;

pub type Result<T, E = ComputeError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("no Metal device is available")]
    NoDevice,

    #[error("`{what}` returned nil")]
    NullObject { what: &'static str },

    /// The kernel source did not compile. `diagnostic` is the compiler's
    /// description of the failure.
    #[error("kernel compilation failed: {diagnostic}")]
    Compile { diagnostic: String },

    #[error("function `{name}` not found (available: [{}])", .available.join(", "))]
    FunctionNotFound { name: String, available: Vec<String> },

    #[error("failed to build a pipeline state for `{function}`: {diagnostic}")]
    PipelineState { function: String, diagnostic: String },

    #[error("failed to allocate a buffer of {length} bytes")]
    BufferAllocation { length: usize },

    #[error("buffers must be at least one byte long")]
    EmptyBuffer,

    #[error("buffer slot {index} is out of range (slots 0..{max})")]
    InvalidBinding { index: usize, max: usize },

    #[error("offset {offset} is outside a buffer of {length} bytes")]
    BufferRange { offset: usize, length: usize },

    #[error("{size} bytes do not fit in a buffer of {length} bytes")]
    BufferOverflow { size: usize, length: usize },

    #[error("inline parameter data must be 1..={max} bytes, got {length}")]
    InlineBytes { length: usize, max: usize },

    /// The pipeline's kernel uses a buffer slot that nothing was bound to.
    #[error("buffer slot {index} is used by the kernel but nothing is bound to it")]
    MissingBinding { index: usize },

    /// Two job inputs were assigned the same buffer slot.
    #[error("data and parameters are both bound to buffer slot {index}")]
    BindingConflict { index: usize },

    #[error("no compute pipeline state is bound to the encoder")]
    MissingPipelineState,

    #[error("invalid dispatch: {0}")]
    InvalidDispatch(String),

    /// Mapped memory was touched while a committed command buffer that
    /// binds the buffer has not been waited on.
    #[error("buffer is bound to a command buffer that has not completed")]
    BufferInFlight,

    #[error("a buffer of {length} bytes cannot be viewed as {element}-byte elements")]
    ElementLayout { length: usize, element: usize },

    #[error("buffer storage is not CPU-visible")]
    StorageNotMapped,

    #[error("command buffer failed: {diagnostic}")]
    CommandBufferFailed { diagnostic: String },

    #[error("unknown command buffer status {0}")]
    UnknownStatus(usize),

    #[error("kernel translation failed: {0}")]
    Transpile(String),

    #[error("unsupported kernel file {path:?}: expected .metal, .wgsl or .metallib")]
    UnsupportedKernelFile { path: std::path::PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
