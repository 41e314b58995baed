//! Names resolvable through the builtins namespace (`O` tag).

use strum::{EnumString, IntoStaticStr};

use crate::config::HostVersion;

/// Every builtin function or type a constant may refer to by name.
///
/// Uses strum derives for `FromStr` and `Into<&'static str>`; names are the
/// lowercase builtin names (`Bytearray` -> "bytearray").
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    Abs,
    Aiter,
    All,
    Anext,
    Any,
    Ascii,
    Bin,
    Bool,
    Breakpoint,
    Bytearray,
    Bytes,
    Callable,
    Chr,
    Classmethod,
    Compile,
    Complex,
    Delattr,
    Dict,
    Dir,
    Divmod,
    Enumerate,
    Eval,
    Exec,
    Filter,
    Float,
    Format,
    Frozenset,
    Getattr,
    Globals,
    Hasattr,
    Hash,
    Help,
    Hex,
    Id,
    Input,
    Int,
    Isinstance,
    Issubclass,
    Iter,
    Len,
    List,
    Locals,
    Map,
    Max,
    Memoryview,
    Min,
    Next,
    Object,
    Oct,
    Open,
    Ord,
    Pow,
    Print,
    Property,
    Range,
    Repr,
    Reversed,
    Round,
    Set,
    Setattr,
    Slice,
    Sorted,
    Staticmethod,
    Str,
    Sum,
    Super,
    Tuple,
    Type,
    Vars,
    Zip,
    #[strum(serialize = "__import__")]
    Import,
    #[strum(serialize = "__build_class__")]
    BuildClass,

    // ==========================
    // 2.x only
    Apply,
    Basestring,
    Buffer,
    Cmp,
    Coerce,
    Execfile,
    File,
    Intern,
    Long,
    #[strum(serialize = "raw_input")]
    RawInput,
    Reduce,
    Reload,
    Unichr,
    Unicode,
    Xrange,
}

impl Builtin {
    /// Whether this name is a class rather than a function.
    #[must_use]
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Bytearray
                | Self::Bytes
                | Self::Classmethod
                | Self::Complex
                | Self::Dict
                | Self::Enumerate
                | Self::Filter
                | Self::Float
                | Self::Frozenset
                | Self::Int
                | Self::List
                | Self::Map
                | Self::Memoryview
                | Self::Object
                | Self::Property
                | Self::Range
                | Self::Reversed
                | Self::Set
                | Self::Slice
                | Self::Staticmethod
                | Self::Str
                | Self::Super
                | Self::Tuple
                | Self::Type
                | Self::Zip
                | Self::Basestring
                | Self::Buffer
                | Self::File
                | Self::Long
                | Self::Unicode
                | Self::Xrange
        )
    }

    /// Whether the builtins namespace of `version` defines this name.
    #[must_use]
    pub fn available_in(self, version: HostVersion) -> bool {
        match self {
            Self::Apply
            | Self::Basestring
            | Self::Buffer
            | Self::Cmp
            | Self::Coerce
            | Self::Execfile
            | Self::File
            | Self::Intern
            | Self::Long
            | Self::RawInput
            | Self::Reduce
            | Self::Reload
            | Self::Unichr
            | Self::Unicode
            | Self::Xrange => version.major == 2,
            Self::Ascii | Self::Exec | Self::BuildClass => version.major >= 3,
            Self::Breakpoint => version >= HostVersion::new(3, 7),
            Self::Aiter | Self::Anext => version >= HostVersion::PY310,
            _ => true,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}
