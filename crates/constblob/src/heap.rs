use ahash::RandomState;
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;

use crate::{
    types::{CodeDescriptor, Str},
    value::{ConstId, Value},
};

/// Insertion-ordered mapping used for dict constants; keys compare by identity.
pub type ValueMap = IndexMap<Value, Value, RandomState>;
/// Insertion-ordered set used for set and frozenset constants.
pub type ValueSet = IndexSet<Value, RandomState>;

/// Payload of an arena-allocated constant.
#[derive(Debug, Clone)]
pub enum HeapData {
    /// Integer outside the small-int range that still fits in an `i64`.
    Int(i64),
    LongInt(BigInt),
    Float(f64),
    Complex {
        real: f64,
        imag: f64,
    },
    Str(Str),
    Bytes(Vec<u8>),
    /// Mutable at runtime, so never shared between occurrences.
    ByteArray(Vec<u8>),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Dict(ValueMap),
    Set(ValueSet),
    FrozenSet(ValueSet),
    Slice {
        start: Value,
        stop: Value,
        step: Value,
    },
    /// Operands are int constants of any size.
    Range {
        start: Value,
        stop: Value,
        step: Value,
    },
    Code(Box<CodeDescriptor>),
    /// `origin[args]` for hosts with builtin generic aliases.
    GenericAlias {
        origin: Value,
        args: Value,
    },
    /// `X | Y` union built from a tuple of member types.
    UnionType {
        args: Value,
    },
}

impl HeapData {
    /// Host type name of this payload, as it appears in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) | Self::LongInt(_) => "int",
            Self::Float(_) => "float",
            Self::Complex { .. } => "complex",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::ByteArray(_) => "bytearray",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::FrozenSet(_) => "frozenset",
            Self::Slice { .. } => "slice",
            Self::Range { .. } => "range",
            Self::Code(_) => "code",
            Self::GenericAlias { .. } => "types.GenericAlias",
            Self::UnionType { .. } => "types.UnionType",
        }
    }
}

/// Arena holding every decoded constant.
///
/// Constants are immortal: nothing is ever removed, so ids handed out by
/// [`Heap::allocate`] remain valid for as long as the heap exists. Values are
/// never mutated after decoding except for the interned flag on text.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapData>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `data` and returns its id.
    ///
    /// # Panics
    /// Panics once the arena holds `u32::MAX` constants.
    pub(crate) fn allocate(&mut self, data: HeapData) -> ConstId {
        let id = ConstId::new(self.objects.len());
        self.objects.push(data);
        id
    }

    /// Returns the payload for an id.
    ///
    /// # Panics
    /// Panics if the id was issued by a different heap.
    #[must_use]
    pub fn get(&self, id: ConstId) -> &HeapData {
        &self.objects[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: ConstId) -> &mut HeapData {
        &mut self.objects[id.index()]
    }

    /// Returns the payload a value refers to, if it lives in the arena.
    #[must_use]
    pub fn data(&self, value: Value) -> Option<&HeapData> {
        value.ref_id().map(|id| self.get(id))
    }

    /// Number of objects allocated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Host type name of any value.
    #[must_use]
    pub fn type_name(&self, value: Value) -> &'static str {
        match value {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Ellipsis => "ellipsis",
            Value::NotImplemented => "NotImplementedType",
            Value::SmallInt(_) => "int",
            Value::AnonType(_) | Value::Exception(_) => "type",
            Value::Builtin(b) if b.is_type() => "type",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Ref(id) => self.get(id).type_name(),
            Value::Raw(_) => "raw",
        }
    }

    /// Integer value of an int constant that fits in an `i64`.
    #[must_use]
    pub fn as_i64(&self, value: Value) -> Option<i64> {
        match value {
            Value::SmallInt(i) => Some(i),
            Value::Ref(id) => match self.get(id) {
                HeapData::Int(i) => Some(*i),
                _ => None,
            },
            _ => None,
        }
    }

    /// Numeric value of a float or int constant.
    #[must_use]
    pub fn as_f64(&self, value: Value) -> Option<f64> {
        match value {
            Value::SmallInt(i) => Some(i as f64),
            Value::Ref(id) => match self.get(id) {
                HeapData::Float(f) => Some(*f),
                HeapData::Int(i) => Some(*i as f64),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self, value: Value) -> Option<&str> {
        match self.data(value)? {
            HeapData::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Items of a tuple constant.
    #[must_use]
    pub fn tuple_items(&self, value: Value) -> Option<&[Value]> {
        match self.data(value)? {
            HeapData::Tuple(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(&self, value: Value) -> Option<&CodeDescriptor> {
        match self.data(value)? {
            HeapData::Code(code) => Some(code),
            _ => None,
        }
    }
}
