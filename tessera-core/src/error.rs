use crate::DType;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The native allocator could not satisfy the request.
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    /// An element type disagreed with what the operation required.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Operand shapes cannot be combined, even under the active broadcast mode.
    #[error("incompatible shapes: {0}")]
    IncompatibleShapes(String),

    /// An index key could not be translated into the native descriptor.
    #[error("invalid index: {0}")]
    InvalidIndexType(String),

    /// The dispatcher was handed an operand combination it does not accept.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// A native dtype code with no registered descriptor.
    #[error("unknown dtype code {0}")]
    UnknownDtype(i32),

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Any native status code not otherwise classified, together with the
    /// engine's own diagnostic string.
    #[error("native error {code}: {message}")]
    NativeError { code: i32, message: String },

    #[error("{inner}\n{backtrace}")]
    WithBacktrace {
        inner: Box<Self>,
        backtrace: Box<std::backtrace::Backtrace>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Mismatch between an expected and an observed dtype, formatted once so
    /// every call site reports it the same way.
    pub(crate) fn type_mismatch(expected: DType, got: DType) -> Self {
        Self::TypeMismatch(format!("expected {expected}, got {got}")).bt()
    }

    pub fn bt(self) -> Self {
        let backtrace = std::backtrace::Backtrace::capture();
        match backtrace.status() {
            std::backtrace::BacktraceStatus::Disabled
            | std::backtrace::BacktraceStatus::Unsupported => self,
            _ => Self::WithBacktrace {
                inner: Box::new(self),
                backtrace: Box::new(backtrace),
            },
        }
    }

    /// Strip any backtrace wrapper, exposing the underlying variant.
    ///
    /// Useful when matching on the error kind in callers and tests.
    pub fn kind(&self) -> &Self {
        match self {
            Self::WithBacktrace { inner, .. } => inner.kind(),
            other => other,
        }
    }
}
