//! Owned, serialisable snapshot of decoded constants.
//!
//! [`Value`] is a handle into the arena; `ConstObject` is a standalone tree
//! that can be compared structurally, serialised with serde, or printed as
//! the host's `repr()` text.

use std::fmt::{self, Write};

use num_bigint::BigInt;
use serde::{Serialize, Serializer};

use crate::{
    heap::{Heap, HeapData},
    types::{bytes::bytes_repr_fmt, number, str::string_repr_fmt},
    value::Value,
};

/// Owned copy of a constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstObject {
    None,
    Ellipsis,
    NotImplemented,
    Bool(bool),
    Int(i64),
    /// Serialised as a decimal string so JSON readers keep every digit.
    BigInt(#[serde(serialize_with = "serialize_decimal")] BigInt),
    Float(f64),
    Complex {
        real: f64,
        imag: f64,
    },
    String(String),
    Bytes(Vec<u8>),
    ByteArray(Vec<u8>),
    Tuple(Vec<ConstObject>),
    List(Vec<ConstObject>),
    Dict(Vec<(ConstObject, ConstObject)>),
    Set(Vec<ConstObject>),
    FrozenSet(Vec<ConstObject>),
    Slice {
        start: Box<ConstObject>,
        stop: Box<ConstObject>,
        step: Box<ConstObject>,
    },
    Range {
        start: Box<ConstObject>,
        stop: Box<ConstObject>,
        step: Box<ConstObject>,
    },
    Code(Box<CodeObject>),
    GenericAlias {
        origin: Box<ConstObject>,
        args: Box<ConstObject>,
    },
    UnionType(Vec<ConstObject>),
    /// A class: builtin type, anonymous runtime type or exception class.
    Type(&'static str),
    /// A builtin function.
    Builtin(&'static str),
    /// Raw payload bytes referenced by position.
    Raw {
        offset: usize,
        len: usize,
    },
}

/// Owned copy of a code-object descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeObject {
    pub name: String,
    pub qualname: Option<String>,
    pub line: i32,
    pub flags: i32,
    pub arg_names: Vec<String>,
    pub free_vars: Vec<String>,
    pub arg_count: i32,
    pub kw_only_count: Option<i32>,
    pub pos_only_count: Option<i32>,
}

fn serialize_decimal<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl Heap {
    /// Builds an owned tree for a decoded value.
    #[must_use]
    pub fn to_object(&self, value: Value) -> ConstObject {
        match value {
            Value::None => ConstObject::None,
            Value::Bool(b) => ConstObject::Bool(b),
            Value::Ellipsis => ConstObject::Ellipsis,
            Value::NotImplemented => ConstObject::NotImplemented,
            Value::SmallInt(i) => ConstObject::Int(i),
            Value::AnonType(t) => ConstObject::Type(t.name()),
            Value::Builtin(b) if b.is_type() => ConstObject::Type(b.name()),
            Value::Builtin(b) => ConstObject::Builtin(b.name()),
            Value::Exception(e) => ConstObject::Type(e.name()),
            Value::Raw(span) => ConstObject::Raw {
                offset: span.offset,
                len: span.len,
            },
            Value::Ref(id) => self.data_to_object(self.get(id)),
        }
    }

    fn objects(&self, values: &[Value]) -> Vec<ConstObject> {
        values.iter().map(|v| self.to_object(*v)).collect()
    }

    fn boxed(&self, value: Value) -> Box<ConstObject> {
        Box::new(self.to_object(value))
    }

    /// Text of a name constant; names are always `str` in a well-formed blob.
    fn name_text(&self, value: Value) -> String {
        match self.as_str(value) {
            Some(s) => s.to_owned(),
            None => self.to_object(value).to_string(),
        }
    }

    fn name_list(&self, value: Value) -> Vec<String> {
        self.tuple_items(value)
            .unwrap_or_default()
            .iter()
            .map(|v| self.name_text(*v))
            .collect()
    }

    fn data_to_object(&self, data: &HeapData) -> ConstObject {
        match data {
            HeapData::Int(i) => ConstObject::Int(*i),
            HeapData::LongInt(b) => ConstObject::BigInt(b.clone()),
            HeapData::Float(f) => ConstObject::Float(*f),
            HeapData::Complex { real, imag } => ConstObject::Complex {
                real: *real,
                imag: *imag,
            },
            HeapData::Str(s) => ConstObject::String(s.as_str().to_owned()),
            HeapData::Bytes(b) => ConstObject::Bytes(b.clone()),
            HeapData::ByteArray(b) => ConstObject::ByteArray(b.clone()),
            HeapData::Tuple(items) => ConstObject::Tuple(self.objects(items)),
            HeapData::List(items) => ConstObject::List(self.objects(items)),
            HeapData::Dict(map) => ConstObject::Dict(
                map.iter()
                    .map(|(k, v)| (self.to_object(*k), self.to_object(*v)))
                    .collect(),
            ),
            HeapData::Set(set) => ConstObject::Set(set.iter().map(|v| self.to_object(*v)).collect()),
            HeapData::FrozenSet(set) => ConstObject::FrozenSet(set.iter().map(|v| self.to_object(*v)).collect()),
            HeapData::Slice { start, stop, step } => ConstObject::Slice {
                start: self.boxed(*start),
                stop: self.boxed(*stop),
                step: self.boxed(*step),
            },
            HeapData::Range { start, stop, step } => ConstObject::Range {
                start: self.boxed(*start),
                stop: self.boxed(*stop),
                step: self.boxed(*step),
            },
            HeapData::Code(code) => ConstObject::Code(Box::new(CodeObject {
                name: self.name_text(code.name()),
                qualname: code.qualname().map(|q| self.name_text(q)),
                line: code.line(),
                flags: code.flags(),
                arg_names: self.name_list(code.arg_names()),
                free_vars: self.name_list(code.free_vars()),
                arg_count: code.arg_count(),
                kw_only_count: code.kw_only_count(),
                pos_only_count: code.pos_only_count(),
            })),
            HeapData::GenericAlias { origin, args } => ConstObject::GenericAlias {
                origin: self.boxed(*origin),
                args: self.boxed(*args),
            },
            HeapData::UnionType { args } => {
                ConstObject::UnionType(self.tuple_items(*args).map(|items| self.objects(items)).unwrap_or_default())
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[ConstObject], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Types print bare inside generic aliases and unions: `list[int]`, `int | None`.
fn write_type_arg(f: &mut fmt::Formatter<'_>, obj: &ConstObject) -> fmt::Result {
    match obj {
        ConstObject::Type(name) => f.write_str(name),
        ConstObject::None => f.write_str("None"),
        other => write!(f, "{other}"),
    }
}

impl fmt::Display for ConstObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Ellipsis => f.write_str("Ellipsis"),
            Self::NotImplemented => f.write_str("NotImplemented"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::BigInt(b) => write!(f, "{b}"),
            Self::Float(v) => number::float_repr_fmt(*v, f),
            Self::Complex { real, imag } => number::complex_repr_fmt(*real, *imag, f),
            Self::String(s) => string_repr_fmt(s, f),
            Self::Bytes(b) => bytes_repr_fmt(b, f),
            Self::ByteArray(b) => {
                f.write_str("bytearray(")?;
                bytes_repr_fmt(b, f)?;
                f.write_char(')')
            }
            Self::Tuple(items) => {
                f.write_char('(')?;
                write_joined(f, items, ", ")?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Self::List(items) => {
                f.write_char('[')?;
                write_joined(f, items, ", ")?;
                f.write_char(']')
            }
            Self::Dict(pairs) => {
                f.write_char('{')?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_char('}')
            }
            Self::Set(items) if items.is_empty() => f.write_str("set()"),
            Self::Set(items) => {
                f.write_char('{')?;
                write_joined(f, items, ", ")?;
                f.write_char('}')
            }
            Self::FrozenSet(items) if items.is_empty() => f.write_str("frozenset()"),
            Self::FrozenSet(items) => {
                f.write_str("frozenset({")?;
                write_joined(f, items, ", ")?;
                f.write_str("})")
            }
            Self::Slice { start, stop, step } => write!(f, "slice({start}, {stop}, {step})"),
            Self::Range { start, stop, step } if **step == Self::Int(1) => write!(f, "range({start}, {stop})"),
            Self::Range { start, stop, step } => write!(f, "range({start}, {stop}, {step})"),
            Self::Code(code) => write!(f, "<code object {}, line {}>", code.name, code.line),
            Self::GenericAlias { origin, args } => {
                write_type_arg(f, origin)?;
                f.write_char('[')?;
                match args.as_ref() {
                    Self::Tuple(items) => {
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write_type_arg(f, item)?;
                        }
                    }
                    other => write_type_arg(f, other)?,
                }
                f.write_char(']')
            }
            Self::UnionType(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write_type_arg(f, item)?;
                }
                Ok(())
            }
            Self::Type(name) => write!(f, "<class '{name}'>"),
            Self::Builtin(name) => write!(f, "<built-in function {name}>"),
            Self::Raw { offset, len } => write!(f, "<raw data at {offset}, {len} bytes>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_reprs() {
        let one = ConstObject::Int(1);
        assert_eq!(ConstObject::Tuple(vec![]).to_string(), "()");
        assert_eq!(ConstObject::Tuple(vec![one.clone()]).to_string(), "(1,)");
        assert_eq!(
            ConstObject::List(vec![one.clone(), ConstObject::String("a".to_owned())]).to_string(),
            "[1, 'a']"
        );
        assert_eq!(
            ConstObject::Dict(vec![(ConstObject::String("k".to_owned()), ConstObject::None)]).to_string(),
            "{'k': None}"
        );
        assert_eq!(ConstObject::Set(vec![]).to_string(), "set()");
        assert_eq!(ConstObject::FrozenSet(vec![one.clone()]).to_string(), "frozenset({1})");
        assert_eq!(ConstObject::FrozenSet(vec![]).to_string(), "frozenset()");
    }

    #[test]
    fn scalar_reprs() {
        assert_eq!(ConstObject::Bool(true).to_string(), "True");
        assert_eq!(ConstObject::Float(0.5).to_string(), "0.5");
        assert_eq!(ConstObject::Bytes(b"x\n".to_vec()).to_string(), "b'x\\n'");
        assert_eq!(ConstObject::ByteArray(b"x".to_vec()).to_string(), "bytearray(b'x')");
        assert_eq!(ConstObject::BigInt(BigInt::from(1u8) << 70).to_string(), "1180591620717411303424");
    }

    #[test]
    fn slice_and_range_reprs() {
        let slice = ConstObject::Slice {
            start: Box::new(ConstObject::Int(1)),
            stop: Box::new(ConstObject::None),
            step: Box::new(ConstObject::None),
        };
        assert_eq!(slice.to_string(), "slice(1, None, None)");
        let range = ConstObject::Range {
            start: Box::new(ConstObject::Int(0)),
            stop: Box::new(ConstObject::Int(10)),
            step: Box::new(ConstObject::Int(1)),
        };
        assert_eq!(range.to_string(), "range(0, 10)");
        let range = ConstObject::Range {
            start: Box::new(ConstObject::Int(10)),
            stop: Box::new(ConstObject::Int(0)),
            step: Box::new(ConstObject::Int(-2)),
        };
        assert_eq!(range.to_string(), "range(10, 0, -2)");
    }

    #[test]
    fn typing_reprs() {
        let alias = ConstObject::GenericAlias {
            origin: Box::new(ConstObject::Type("dict")),
            args: Box::new(ConstObject::Tuple(vec![ConstObject::Type("str"), ConstObject::Type("int")])),
        };
        assert_eq!(alias.to_string(), "dict[str, int]");
        let union = ConstObject::UnionType(vec![ConstObject::Type("int"), ConstObject::None]);
        assert_eq!(union.to_string(), "int | None");
        assert_eq!(ConstObject::Type("ValueError").to_string(), "<class 'ValueError'>");
        assert_eq!(ConstObject::Builtin("len").to_string(), "<built-in function len>");
    }

    #[test]
    fn serializes_with_type_tags() {
        let json = serde_json::to_value(ConstObject::Tuple(vec![ConstObject::Int(1), ConstObject::None])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "tuple", "value": [{"type": "int", "value": 1}, {"type": "none"}]})
        );
    }
}
