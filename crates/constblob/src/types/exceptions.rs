//! Builtin exception classes resolvable by name (`E` tag, and `O` as fallback).

use strum::{EnumString, IntoStaticStr};

use crate::config::HostVersion;

/// Builtin exception and warning classes.
///
/// Variant names are the class names, so strum's `FromStr` resolves
/// `"ValueError"` directly.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
pub enum ExcType {
    BaseException,
    BaseExceptionGroup,
    Exception,
    ExceptionGroup,
    ArithmeticError,
    AssertionError,
    AttributeError,
    BlockingIOError,
    BrokenPipeError,
    BufferError,
    ChildProcessError,
    ConnectionAbortedError,
    ConnectionError,
    ConnectionRefusedError,
    ConnectionResetError,
    EOFError,
    EnvironmentError,
    FileExistsError,
    FileNotFoundError,
    FloatingPointError,
    GeneratorExit,
    IOError,
    ImportError,
    IndentationError,
    IndexError,
    InterruptedError,
    IsADirectoryError,
    KeyError,
    KeyboardInterrupt,
    LookupError,
    MemoryError,
    ModuleNotFoundError,
    NameError,
    NotADirectoryError,
    NotImplementedError,
    OSError,
    OverflowError,
    PermissionError,
    ProcessLookupError,
    PythonFinalizationError,
    RecursionError,
    ReferenceError,
    RuntimeError,
    StandardError,
    StopAsyncIteration,
    StopIteration,
    SyntaxError,
    SystemError,
    SystemExit,
    TabError,
    TimeoutError,
    TypeError,
    UnboundLocalError,
    UnicodeDecodeError,
    UnicodeEncodeError,
    UnicodeError,
    UnicodeTranslateError,
    ValueError,
    ZeroDivisionError,

    // ==========================
    // Warnings
    Warning,
    BytesWarning,
    DeprecationWarning,
    EncodingWarning,
    FutureWarning,
    ImportWarning,
    PendingDeprecationWarning,
    ResourceWarning,
    RuntimeWarning,
    SyntaxWarning,
    UnicodeWarning,
    UserWarning,
}

impl ExcType {
    /// Whether the builtins namespace of `version` defines this class.
    #[must_use]
    pub fn available_in(self, version: HostVersion) -> bool {
        match self {
            Self::StandardError => version.major == 2,
            Self::BlockingIOError
            | Self::BrokenPipeError
            | Self::ChildProcessError
            | Self::ConnectionAbortedError
            | Self::ConnectionError
            | Self::ConnectionRefusedError
            | Self::ConnectionResetError
            | Self::FileExistsError
            | Self::FileNotFoundError
            | Self::InterruptedError
            | Self::IsADirectoryError
            | Self::NotADirectoryError
            | Self::PermissionError
            | Self::ProcessLookupError
            | Self::TimeoutError
            | Self::ResourceWarning => version.major >= 3,
            Self::RecursionError | Self::StopAsyncIteration => version >= HostVersion::new(3, 5),
            Self::ModuleNotFoundError => version >= HostVersion::new(3, 6),
            Self::EncodingWarning => version >= HostVersion::PY310,
            Self::BaseExceptionGroup | Self::ExceptionGroup => version >= HostVersion::PY311,
            Self::PythonFinalizationError => version >= HostVersion::new(3, 13),
            _ => true,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}
