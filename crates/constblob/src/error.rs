//! Error type shared by the reader, decoder, and blob locator.
//!
//! Every variant describes a blob that cannot be used. Library callers get the
//! error back as a `Result`; the process-wide entry point in [`crate::global`]
//! treats all of them as fatal.

use std::path::PathBuf;

use crate::config::HostVersion;

/// Result alias used throughout the crate.
pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("constants blob is too small ({got} bytes, need at least {min})")]
    TooSmall { got: usize, min: usize },

    #[error("constants blob declares {declared} payload bytes but only {actual} are present")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("constants blob checksum mismatch (stored {expected:#010x}, computed {actual:#010x})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("host version {0} is not supported by this constants format")]
    UnsupportedVersion(HostVersion),

    #[error("unexpected end of constants data at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("variable length integer overflows 64 bits at offset {offset}")]
    VarintOverflow { offset: usize },

    #[error("unknown constant tag {tag:#04x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("constant tag '{tag}' is not valid for host version {version} (offset {offset})")]
    TagNotSupported { tag: char, version: HostVersion, offset: usize },

    #[error("corruption marker found at offset {offset}")]
    CorruptMarker { offset: usize },

    #[error("back-reference without a preceding value at offset {offset}")]
    DanglingBackReference { offset: usize },

    #[error("text constant at offset {offset} is not valid UTF-8")]
    InvalidText { offset: usize },

    #[error("unknown anonymous value index {index} at offset {offset}")]
    UnknownAnonValue { index: u8, offset: usize },

    #[error("unknown special value index {index} at offset {offset}")]
    UnknownSpecialValue { index: u8, offset: usize },

    #[error("unknown special float selector {selector} at offset {offset}")]
    UnknownSpecialFloat { selector: u8, offset: usize },

    #[error("builtin {0:?} not found")]
    UnknownBuiltin(String),

    #[error("exception class {0:?} not found")]
    UnknownException(String),

    #[error("expected {expected} constant, found {found} (offset {offset})")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
        offset: usize,
    },

    #[error("constants nesting exceeds {limit} levels at offset {offset}")]
    NestingTooDeep { limit: usize, offset: usize },

    #[error("segment {0:?} not found in constants blob")]
    SegmentNotFound(String),

    #[error("segment {name:?} holds {found} constants, caller expected {expected}")]
    CountMismatch { name: String, expected: usize, found: usize },

    #[error("segment {name:?} has {remaining} unread bytes after its constants")]
    TrailingBytes { name: String, remaining: usize },

    #[error("no constants runtime has been installed")]
    NotInstalled,

    #[error("a constants runtime is already installed")]
    AlreadyInstalled,

    #[error("failed to read constants blob from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
