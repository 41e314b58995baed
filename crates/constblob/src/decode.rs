//! Tagged-value decoder.
//!
//! Recursive descent over the segment byte stream: one tag byte selects how
//! the following bytes are read, containers recurse into their elements, and
//! every shareable result is canonicalised through [`ConstCaches`] before it
//! is handed back.

use ahash::RandomState;
use num_bigint::BigInt;
use num_traits::Zero;

use crate::{
    cache::{CacheKind, ConstCaches},
    config::RuntimeConfig,
    error::{BlobError, BlobResult},
    heap::{Heap, HeapData, ValueMap, ValueSet},
    reader::BlobReader,
    tag::Tag,
    types::{AnonType, Builtin, CodeDescriptor, ExcType, SpecialFloat, SpecialValue, Str},
    value::{BlobSpan, ConstId, SMALL_INT_MAX, SMALL_INT_MIN, Value},
};

/// Bits per limb of a `G`/`g` big integer.
const LIMB_BITS: usize = 31;

/// Objects created at most once per runtime.
#[derive(Debug, Default)]
pub(crate) struct Singletons {
    pub(crate) empty_tuple: Option<ConstId>,
    pub(crate) empty_frozenset: Option<ConstId>,
    pub(crate) special_floats: [Option<ConstId>; SpecialFloat::COUNT],
    pub(crate) version_info: Option<ConstId>,
}

/// Decoder over one segment body.
///
/// With `dedup` off, ordinary constants are allocated fresh; this is how the
/// bytecode segment is decoded, since its constants are only ever used once.
/// Runtime-wide singletons still go through `caches` when they exist, so a
/// singleton first met in the bytecode segment is the cached object.
pub(crate) struct Decoder<'d> {
    reader: BlobReader<'d>,
    heap: &'d mut Heap,
    caches: Option<&'d mut ConstCaches>,
    dedup: bool,
    singletons: &'d mut Singletons,
    config: RuntimeConfig,
    depth: usize,
}

impl<'d> Decoder<'d> {
    pub fn new(
        reader: BlobReader<'d>,
        heap: &'d mut Heap,
        caches: Option<&'d mut ConstCaches>,
        dedup: bool,
        singletons: &'d mut Singletons,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            reader,
            heap,
            caches,
            dedup,
            singletons,
            config,
            depth: 0,
        }
    }

    /// Decodes a segment body: a `u16` count followed by that many constants.
    pub fn decode_segment(&mut self) -> BlobResult<Vec<Value>> {
        let count = self.reader.read_u16()?;
        self.decode_batch(usize::from(count))
    }

    /// Bytes left unread in the segment.
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// Decodes `count` consecutive constants, resolving back-references to
    /// the previous element.
    fn decode_batch(&mut self, count: usize) -> BlobResult<Vec<Value>> {
        // every constant takes at least one byte, so a corrupt count can't over-allocate
        let mut values = Vec::with_capacity(count.min(self.reader.remaining()));
        for _ in 0..count {
            let previous = values.last().copied();
            values.push(self.decode_one(previous)?);
        }
        Ok(values)
    }

    /// Decodes a single constant outside of any batch.
    fn decode_value(&mut self) -> BlobResult<Value> {
        self.decode_one(None)
    }

    fn decode_one(&mut self, previous: Option<Value>) -> BlobResult<Value> {
        let offset = self.reader.offset();
        let byte = self.reader.read_u8()?;
        let tag = Tag::from_repr(byte).ok_or(BlobError::UnknownTag { tag: byte, offset })?;
        if !tag.is_container() {
            return self.decode_tagged(tag, offset, previous);
        }
        self.depth += 1;
        if self.depth > self.config.max_nesting {
            return Err(BlobError::NestingTooDeep {
                limit: self.config.max_nesting,
                offset,
            });
        }
        let result = self.decode_tagged(tag, offset, previous);
        self.depth -= 1;
        result
    }

    fn decode_tagged(&mut self, tag: Tag, offset: usize, previous: Option<Value>) -> BlobResult<Value> {
        let version = self.config.host_version;
        match tag {
            Tag::BackRef => previous.ok_or(BlobError::DanglingBackReference { offset }),

            Tag::None => Ok(Value::None),
            Tag::True => Ok(Value::Bool(true)),
            Tag::False => Ok(Value::Bool(false)),

            Tag::IntPositive | Tag::IntNegative => {
                self.require(version.has_legacy_ints(), tag, offset)?;
                let magnitude = self.reader.read_varint()?;
                Ok(self.int_from_magnitude(tag == Tag::IntNegative, magnitude))
            }
            Tag::LongPositive | Tag::LongNegative => {
                let magnitude = self.reader.read_varint()?;
                Ok(self.int_from_magnitude(tag == Tag::LongNegative, magnitude))
            }
            Tag::BigIntPositive | Tag::BigIntNegative => {
                let limbs = self.reader.read_len()?;
                let mut acc = BigInt::zero();
                for _ in 0..limbs {
                    let limb = self.reader.read_varint()?;
                    acc = (acc << LIMB_BITS) + limb;
                }
                if tag == Tag::BigIntNegative {
                    acc = -acc;
                }
                Ok(self.int_from_bigint(acc))
            }

            Tag::Float => {
                let value = self.reader.read_f64()?;
                Ok(Value::Ref(self.share(CacheKind::Float, HeapData::Float(value))))
            }
            Tag::Complex => {
                let real = self.reader.read_f64()?;
                let imag = self.reader.read_f64()?;
                Ok(self.allocate(HeapData::Complex { real, imag }))
            }
            Tag::ComplexComposed => {
                let parts = self.decode_batch(2)?;
                let real = self.expect_float(parts[0], offset)?;
                let imag = self.expect_float(parts[1], offset)?;
                Ok(self.allocate(HeapData::Complex { real, imag }))
            }
            Tag::SpecialFloat => {
                let selector = self.reader.read_u8()?;
                let special =
                    SpecialFloat::from_repr(selector).ok_or(BlobError::UnknownSpecialFloat { selector, offset })?;
                Ok(self.special_float(special))
            }

            Tag::AttributeName => {
                let raw = self.reader.read_cstr()?;
                let text = decode_text(raw, offset)?;
                Ok(self.text(text, true))
            }
            Tag::TextZeroTerminated => {
                let raw = self.reader.read_cstr()?;
                let text = decode_text(raw, offset)?;
                Ok(self.text(text, false))
            }
            Tag::TextSized => {
                let len = self.reader.read_len()?;
                let raw = self.reader.read_bytes(len)?;
                let text = decode_text(raw, offset)?;
                Ok(self.text(text, false))
            }
            Tag::TextChar => {
                let first = self.reader.peek_u8().ok_or(BlobError::UnexpectedEof {
                    offset: self.reader.offset(),
                })?;
                let width = utf8_width(first).ok_or(BlobError::InvalidText { offset })?;
                let raw = self.reader.read_bytes(width)?;
                let text = decode_text(raw, offset)?;
                Ok(self.text(text, false))
            }

            Tag::BytesZeroTerminated => {
                let raw = self.reader.read_cstr()?;
                Ok(Value::Ref(self.share(CacheKind::Bytes, HeapData::Bytes(raw.to_vec()))))
            }
            Tag::BytesSized => {
                let len = self.reader.read_len()?;
                let raw = self.reader.read_bytes(len)?;
                Ok(Value::Ref(self.share(CacheKind::Bytes, HeapData::Bytes(raw.to_vec()))))
            }
            Tag::BytesChar => {
                let raw = self.reader.read_bytes(1)?;
                Ok(Value::Ref(self.share(CacheKind::Bytes, HeapData::Bytes(raw.to_vec()))))
            }
            Tag::ByteArray => {
                let len = self.reader.read_len()?;
                let raw = self.reader.read_bytes(len)?;
                Ok(self.allocate(HeapData::ByteArray(raw.to_vec())))
            }

            Tag::Tuple => {
                let len = self.reader.read_len()?;
                let items = self.decode_batch(len)?;
                Ok(Value::Ref(self.tuple(items)))
            }
            Tag::List => {
                let len = self.reader.read_len()?;
                let items = self.decode_batch(len)?;
                Ok(Value::Ref(self.share(CacheKind::List, HeapData::List(items))))
            }
            Tag::Dict => {
                let len = self.reader.read_len()?;
                let keys = self.decode_batch(len)?;
                let values = self.decode_batch(len)?;
                let mut map = ValueMap::with_capacity_and_hasher(len, RandomState::new());
                map.extend(keys.into_iter().zip(values));
                Ok(Value::Ref(self.share(CacheKind::Dict, HeapData::Dict(map))))
            }
            Tag::Set => {
                let len = self.reader.read_len()?;
                let items: ValueSet = self.decode_batch(len)?.into_iter().collect();
                Ok(Value::Ref(self.share(CacheKind::Set, HeapData::Set(items))))
            }
            Tag::FrozenSet => {
                let len = self.reader.read_len()?;
                if len == 0 {
                    return Ok(Value::Ref(self.empty_frozenset()));
                }
                let items: ValueSet = self.decode_batch(len)?.into_iter().collect();
                Ok(Value::Ref(self.share(CacheKind::FrozenSet, HeapData::FrozenSet(items))))
            }

            Tag::Slice => {
                let parts = self.decode_batch(3)?;
                Ok(self.allocate(HeapData::Slice {
                    start: parts[0],
                    stop: parts[1],
                    step: parts[2],
                }))
            }
            Tag::Range => {
                let parts = self.decode_batch(3)?;
                for part in &parts {
                    self.expect_int(*part, offset)?;
                }
                Ok(self.allocate(HeapData::Range {
                    start: parts[0],
                    stop: parts[1],
                    step: parts[2],
                }))
            }

            Tag::AnonValue => {
                let index = self.reader.read_u8()?;
                AnonType::lookup(index, version)
                    .map(Value::AnonType)
                    .ok_or(BlobError::UnknownAnonValue { index, offset })
            }
            Tag::SpecialValue => {
                let index = self.reader.read_u8()?;
                match SpecialValue::from_repr(index) {
                    Some(SpecialValue::Ellipsis) => Ok(Value::Ellipsis),
                    Some(SpecialValue::NotImplemented) => Ok(Value::NotImplemented),
                    Some(SpecialValue::SysVersionInfo) => Ok(Value::Ref(self.version_info())),
                    None => Err(BlobError::UnknownSpecialValue { index, offset }),
                }
            }
            Tag::Builtin => {
                let name = self.read_name(offset)?;
                lookup_builtin(name, self.config)
            }
            Tag::Exception => {
                let name = self.read_name(offset)?;
                lookup_exception(name, self.config).map(Value::Exception)
            }

            Tag::RawData => {
                let len = self.reader.read_len()?;
                let start = self.reader.offset();
                self.reader.read_bytes(len)?;
                Ok(Value::Raw(BlobSpan { offset: start, len }))
            }

            Tag::GenericAlias => {
                self.require(version.has_generic_alias(), tag, offset)?;
                let parts = self.decode_batch(2)?;
                Ok(self.allocate(HeapData::GenericAlias {
                    origin: parts[0],
                    args: parts[1],
                }))
            }
            Tag::UnionType => {
                self.require(version.has_union_type(), tag, offset)?;
                let args = self.decode_value()?;
                self.expect_kind(args, "tuple", offset)?;
                Ok(self.allocate(HeapData::UnionType { args }))
            }

            Tag::Code => self.decode_code(offset),

            Tag::Corrupt => Err(BlobError::CorruptMarker { offset }),
        }
    }

    /// Decodes the fields of a `C` code-object descriptor.
    ///
    /// Which optional fields follow depends on the host version.
    fn decode_code(&mut self, offset: usize) -> BlobResult<Value> {
        let version = self.config.host_version;
        let line = self.reader.read_i32()?;
        let flags = self.reader.read_i32()?;
        let name = self.decode_value()?;
        self.expect_kind(name, "str", offset)?;
        let qualname = if version.has_qualname() {
            let qualname = self.decode_value()?;
            self.expect_kind(qualname, "str", offset)?;
            Some(qualname)
        } else {
            None
        };
        let arg_names = self.decode_value()?;
        self.expect_kind(arg_names, "tuple", offset)?;
        let free_vars = self.decode_value()?;
        self.expect_kind(free_vars, "tuple", offset)?;
        let arg_count = self.reader.read_i32()?;
        let kw_only_count = if version.has_kw_only_args() {
            Some(self.reader.read_i32()?)
        } else {
            None
        };
        let pos_only_count = if version.has_pos_only_args() {
            Some(self.reader.read_i32()?)
        } else {
            None
        };
        Ok(self.allocate(HeapData::Code(Box::new(CodeDescriptor {
            line,
            flags,
            name,
            qualname,
            arg_names,
            free_vars,
            arg_count,
            kw_only_count,
            pos_only_count,
        }))))
    }

    fn require(&self, supported: bool, tag: Tag, offset: usize) -> BlobResult<()> {
        if supported {
            Ok(())
        } else {
            Err(BlobError::TagNotSupported {
                tag: tag.as_char(),
                version: self.config.host_version,
                offset,
            })
        }
    }

    fn read_name(&mut self, offset: usize) -> BlobResult<&'d str> {
        let raw = self.reader.read_cstr()?;
        std::str::from_utf8(raw).map_err(|_| BlobError::InvalidText { offset })
    }

    /// Canonicalises `data` through the cache for `kind`, or allocates it
    /// fresh when dedup is off.
    fn share(&mut self, kind: CacheKind, data: HeapData) -> ConstId {
        if self.dedup {
            self.canonical(kind, data)
        } else {
            self.heap.allocate(data)
        }
    }

    /// Like [`Self::share`] but ignores `dedup`; used for singletons.
    fn canonical(&mut self, kind: CacheKind, data: HeapData) -> ConstId {
        match &mut self.caches {
            Some(caches) => caches.intern(self.heap, kind, data),
            None => self.heap.allocate(data),
        }
    }

    /// Allocates a constant that is never shared.
    fn allocate(&mut self, data: HeapData) -> Value {
        Value::Ref(self.heap.allocate(data))
    }

    fn text(&mut self, text: String, interned: bool) -> Value {
        let id = self.share(CacheKind::Unicode, HeapData::Str(Str::new(text)));
        if interned {
            if let HeapData::Str(s) = self.heap.get_mut(id) {
                s.mark_interned();
            }
        }
        Value::Ref(id)
    }

    fn tuple(&mut self, items: Vec<Value>) -> ConstId {
        if !items.is_empty() {
            return self.share(CacheKind::Tuple, HeapData::Tuple(items));
        }
        if let Some(id) = self.singletons.empty_tuple {
            return id;
        }
        let id = self.heap.allocate(HeapData::Tuple(Vec::new()));
        self.singletons.empty_tuple = Some(id);
        id
    }

    fn empty_frozenset(&mut self) -> ConstId {
        if let Some(id) = self.singletons.empty_frozenset {
            return id;
        }
        let id = self.heap.allocate(HeapData::FrozenSet(ValueSet::default()));
        self.singletons.empty_frozenset = Some(id);
        id
    }

    fn special_float(&mut self, special: SpecialFloat) -> Value {
        let slot = special.index();
        let id = match self.singletons.special_floats[slot] {
            Some(id) => id,
            None => {
                let id = self.canonical(CacheKind::Float, HeapData::Float(special.value()));
                self.singletons.special_floats[slot] = Some(id);
                id
            }
        };
        Value::Ref(id)
    }

    /// `(major, minor, micro, 'final', 0)` for the configured host.
    fn version_info(&mut self) -> ConstId {
        if let Some(id) = self.singletons.version_info {
            return id;
        }
        let version = self.config.host_version;
        let release = HeapData::Str(Str::new("final".to_owned()));
        let release = Value::Ref(self.canonical(CacheKind::Unicode, release));
        let items = vec![
            Value::SmallInt(i64::from(version.major)),
            Value::SmallInt(i64::from(version.minor)),
            Value::SmallInt(i64::from(version.micro)),
            release,
            Value::SmallInt(0),
        ];
        let id = self.canonical(CacheKind::Tuple, HeapData::Tuple(items));
        self.singletons.version_info = Some(id);
        id
    }

    fn int_from_magnitude(&mut self, negative: bool, magnitude: u64) -> Value {
        let signed = if negative {
            i64::try_from(magnitude).ok().and_then(i64::checked_neg).or_else(|| {
                // -2^63 is the one negative magnitude that still fits
                (magnitude == 1 << 63).then_some(i64::MIN)
            })
        } else {
            i64::try_from(magnitude).ok()
        };
        match signed {
            Some(value) => self.int_from_i64(value),
            None => {
                let big = BigInt::from(magnitude);
                self.int_from_bigint(if negative { -big } else { big })
            }
        }
    }

    fn int_from_i64(&mut self, value: i64) -> Value {
        if (SMALL_INT_MIN..=SMALL_INT_MAX).contains(&value) {
            Value::SmallInt(value)
        } else {
            Value::Ref(self.share(CacheKind::Long, HeapData::Int(value)))
        }
    }

    fn int_from_bigint(&mut self, value: BigInt) -> Value {
        match i64::try_from(&value) {
            Ok(small) => self.int_from_i64(small),
            Err(_) => Value::Ref(self.share(CacheKind::Long, HeapData::LongInt(value))),
        }
    }

    fn expect_kind(&self, value: Value, expected: &'static str, offset: usize) -> BlobResult<()> {
        let found = self.heap.type_name(value);
        if found == expected {
            Ok(())
        } else {
            Err(BlobError::UnexpectedKind { expected, found, offset })
        }
    }

    fn expect_float(&self, value: Value, offset: usize) -> BlobResult<f64> {
        match self.heap.data(value) {
            Some(HeapData::Float(f)) => Ok(*f),
            _ => Err(BlobError::UnexpectedKind {
                expected: "float",
                found: self.heap.type_name(value),
                offset,
            }),
        }
    }

    fn expect_int(&self, value: Value, offset: usize) -> BlobResult<()> {
        match (value, self.heap.data(value)) {
            (Value::SmallInt(_), _) | (_, Some(HeapData::Int(_) | HeapData::LongInt(_))) => Ok(()),
            _ => Err(BlobError::UnexpectedKind {
                expected: "int",
                found: self.heap.type_name(value),
                offset,
            }),
        }
    }
}

fn decode_text(raw: &[u8], offset: usize) -> BlobResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| BlobError::InvalidText { offset })
}

/// Encoded width of a UTF-8 sequence from its lead byte.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7f => Some(1),
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

/// Resolves an `O` name: builtin functions and types first, then exceptions.
fn lookup_builtin(name: &str, config: RuntimeConfig) -> BlobResult<Value> {
    let version = config.host_version;
    if let Some(builtin) = name.parse::<Builtin>().ok().filter(|b| b.available_in(version)) {
        return Ok(Value::Builtin(builtin));
    }
    match lookup_exception(name, config) {
        Ok(exc) => Ok(Value::Exception(exc)),
        Err(_) => Err(BlobError::UnknownBuiltin(name.to_owned())),
    }
}

/// Resolves an `E` name against the exception classes of the host version.
fn lookup_exception(name: &str, config: RuntimeConfig) -> BlobResult<ExcType> {
    name.parse::<ExcType>()
        .ok()
        .filter(|exc| exc.available_in(config.host_version))
        .ok_or_else(|| BlobError::UnknownException(name.to_owned()))
}
