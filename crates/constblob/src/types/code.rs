//! Code-object descriptors (`C` tag).
//!
//! A descriptor carries what the compiled program needs to build a host code
//! object for a function: its names, argument layout and flags. The bytecode
//! itself is never part of a descriptor.

use crate::value::Value;

/// Set when the function takes `*args`.
pub const CO_VARARGS: i32 = 0x04;
/// Set when the function takes `**kwargs`.
pub const CO_VARKEYWORDS: i32 = 0x08;
/// Set for generator functions.
pub const CO_GENERATOR: i32 = 0x20;
/// Set for `async def` functions.
pub const CO_COROUTINE: i32 = 0x100;

/// Decoded code-object descriptor.
///
/// Which optional fields are present depends on the host version the blob was
/// encoded for: `qualname` from 3.11, `kw_only_count` from 3.0 and
/// `pos_only_count` from 3.8.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeDescriptor {
    pub(crate) line: i32,
    pub(crate) flags: i32,
    pub(crate) name: Value,
    pub(crate) qualname: Option<Value>,
    pub(crate) arg_names: Value,
    pub(crate) free_vars: Value,
    pub(crate) arg_count: i32,
    pub(crate) kw_only_count: Option<i32>,
    pub(crate) pos_only_count: Option<i32>,
}

impl CodeDescriptor {
    /// First source line of the function.
    #[must_use]
    pub fn line(&self) -> i32 {
        self.line
    }

    #[must_use]
    pub fn flags(&self) -> i32 {
        self.flags
    }

    /// The function name, a text constant.
    #[must_use]
    pub fn name(&self) -> Value {
        self.name
    }

    #[must_use]
    pub fn qualname(&self) -> Option<Value> {
        self.qualname
    }

    /// Tuple of argument (and local) names.
    #[must_use]
    pub fn arg_names(&self) -> Value {
        self.arg_names
    }

    /// Tuple of free variable names.
    #[must_use]
    pub fn free_vars(&self) -> Value {
        self.free_vars
    }

    #[must_use]
    pub fn arg_count(&self) -> i32 {
        self.arg_count
    }

    #[must_use]
    pub fn kw_only_count(&self) -> Option<i32> {
        self.kw_only_count
    }

    #[must_use]
    pub fn pos_only_count(&self) -> Option<i32> {
        self.pos_only_count
    }

    #[must_use]
    pub fn is_generator(&self) -> bool {
        self.flags & CO_GENERATOR != 0
    }

    #[must_use]
    pub fn is_coroutine(&self) -> bool {
        self.flags & CO_COROUTINE != 0
    }

    #[must_use]
    pub fn has_varargs(&self) -> bool {
        self.flags & CO_VARARGS != 0
    }

    #[must_use]
    pub fn has_varkeywords(&self) -> bool {
        self.flags & CO_VARKEYWORDS != 0
    }
}
