#![doc = include_str!("../../../README.md")]
pub mod blob;
pub mod cache;
mod config;
mod decode;
mod error;
pub mod global;
pub mod hash;
mod heap;
mod object;
pub mod reader;
mod runtime;
mod tag;
pub mod types;
mod value;

pub use crate::{
    blob::{BYTECODE_SEGMENT, BlobLocator, ConstantsBlob, EmbeddedBlob, FileBlob, InMemoryBlob, Segment},
    cache::{CacheKind, CacheStats},
    config::{DEFAULT_MAX_NESTING, HostVersion, ParseVersionError, RuntimeConfig},
    error::{BlobError, BlobResult},
    heap::{Heap, HeapData, ValueMap, ValueSet},
    object::{CodeObject, ConstObject},
    runtime::ConstantsRuntime,
    tag::Tag,
    value::{BlobSpan, ConstId, SMALL_INT_MAX, SMALL_INT_MIN, Value},
};
