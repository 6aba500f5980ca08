//! Errors raised by the bridge before or around a message send.

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid selector {name:?}: {reason}")]
    InvalidSelector { name: String, reason: &'static str },

    #[error("invalid class name {0:?}")]
    InvalidClassName(String),

    #[error("class `{0}` is not registered with the Objective-C runtime")]
    UnknownClass(String),

    /// The receiver does not implement the selector. Sending it anyway would
    /// hit the runtime's unrecognized-selector path.
    #[error("{receiver} does not respond to `{selector}`")]
    UnresolvedMethod { receiver: String, selector: String },

    /// The number of supplied arguments differs from the selector's arity.
    #[error("`{selector}` takes {expected} argument(s) but {supplied} were supplied")]
    TypeContract {
        selector: String,
        expected: usize,
        supplied: usize,
    },

    #[error("`{0}` returned nil")]
    NilObject(String),

    #[error("string bytes are not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("could not wrap {0} bytes as a foreign string")]
    StringWrap(usize),
}

impl BridgeError {
    pub fn nil_object<S: Into<String>>(selector: S) -> Self {
        BridgeError::NilObject(selector.into())
    }
}
