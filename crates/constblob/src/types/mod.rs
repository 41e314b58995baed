//! Constant kinds that need more than an arena payload: name tables,
//! code-object descriptors, and repr formatting.

pub mod builtins;
pub mod bytes;
pub mod code;
pub mod exceptions;
pub mod number;
pub mod singletons;
pub mod str;

pub use builtins::Builtin;
pub use code::CodeDescriptor;
pub use exceptions::ExcType;
pub use singletons::{AnonType, SpecialFloat, SpecialValue};
pub use str::Str;
