//! Error types shared by every Charmy crate.

use crate::framework::FrameworkKind;
use crate::value::ValueKind;

/// Result alias used across the runtime.
pub type Result<T, E = CharmyError> = std::result::Result<T, E>;

/// Errors that can occur while driving the runtime.
#[derive(Debug, thiserror::Error)]
pub enum CharmyError {
    /// An explicit (or derived) id is already registered.
    #[error("an object with id '{id}' is already registered")]
    DuplicateIdentity { id: String },

    /// A configured framework name has no registered implementation.
    #[error("unknown {kind} framework '{name}'")]
    UnknownFramework { kind: FrameworkKind, name: String },

    /// The native UI framework reported an error.
    #[error("native error {code}: {message}")]
    Native { code: i32, message: String },

    /// A value could not be converted to the kind a slot accepts.
    #[error("cannot coerce {found} into {expected}")]
    AttributeCoercion { expected: ValueKind, found: String },

    /// A virtual attribute without a setter was written.
    #[error("attribute '{name}' is read-only")]
    ReadOnlyAttribute { name: String },

    /// The native handle behind a window has already been released.
    #[error("window '{id}' has been destroyed")]
    WindowDestroyed { id: String },

    /// A canvas of this size cannot be allocated.
    #[error("canvas of {width}x{height} pixels is too large")]
    CanvasTooLarge { width: u32, height: u32 },

    /// Work was posted to a worker loop that is not running.
    #[error("worker loop is not running")]
    WorkerStopped,

    /// An error escaped a main loop tick.
    #[error("main loop failed: {0}")]
    LoopFailure(Box<CharmyError>),

    /// Error raised by user code (event handlers, accessors).
    #[error("{0}")]
    Custom(String),
}

impl CharmyError {
    /// Shorthand for [`CharmyError::Custom`].
    pub fn custom(message: impl Into<String>) -> Self {
        CharmyError::Custom(message.into())
    }

    /// Wrap an error escaping the main loop; already wrapped errors are kept as is.
    pub fn loop_failure(error: CharmyError) -> Self {
        match error {
            CharmyError::LoopFailure(_) => error,
            other => CharmyError::LoopFailure(Box::new(other)),
        }
    }

    /// The innermost error, looking through [`CharmyError::LoopFailure`].
    pub fn root_cause(&self) -> &CharmyError {
        match self {
            CharmyError::LoopFailure(inner) => inner.root_cause(),
            other => other,
        }
    }
}
