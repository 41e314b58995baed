//! Decoding whole segments through `ConstantsRuntime`.

mod common;

use common::{Values, blob, segment};
use constblob::{
    BYTECODE_SEGMENT, BlobError, CacheKind, ConstObject, ConstantsRuntime, HeapData, HostVersion, RuntimeConfig,
    Value,
};
use num_bigint::BigInt;

fn runtime(segments: &[(&str, Vec<u8>)]) -> ConstantsRuntime {
    runtime_for(HostVersion::PY311, segments)
}

fn runtime_for(version: HostVersion, segments: &[(&str, Vec<u8>)]) -> ConstantsRuntime {
    ConstantsRuntime::from_bytes(blob(segments), RuntimeConfig::new(version))
}

/// Decodes a single-constant segment and returns its owned form.
fn decode_one(version: HostVersion, values: Values) -> Result<ConstObject, BlobError> {
    let mut rt = runtime_for(version, &[("m", segment(1, values))]);
    let loaded = rt.load_segment("m")?;
    Ok(rt.to_object(loaded[0]))
}

#[test]
fn mymod_scenario() {
    let body = Values::new().int(5).tuple(2).int(1).back_ref();
    let mut rt = runtime(&[("mymod", segment(2, body))]);

    let mut slots = [Value::None; 2];
    rt.load_constants_blob("mymod", &mut slots).unwrap();

    assert_eq!(rt.to_object(slots[0]), ConstObject::Int(5));
    assert_eq!(
        rt.to_object(slots[1]),
        ConstObject::Tuple(vec![ConstObject::Int(1), ConstObject::Int(1)])
    );
    let items = rt.heap().tuple_items(slots[1]).unwrap();
    assert!(items[0].is(&items[1]));
}

#[test]
fn count_mismatch_is_reported() {
    let mut rt = runtime(&[("mymod", segment(1, Values::new().none()))]);
    let mut slots = [Value::None; 2];
    let err = rt.load_constants_blob("mymod", &mut slots).unwrap_err();
    assert!(matches!(err, BlobError::CountMismatch { expected: 2, found: 1, .. }));
}

#[test]
fn equal_constants_share_identity_across_segments() {
    let a = Values::new().float(2.5).tuple(2).int(1).int(2).text("spam").int(100_000);
    let b = Values::new().int(100_000).text("spam").tuple(2).int(1).int(2).float(2.5);
    let mut rt = runtime(&[("a", segment(4, a)), ("b", segment(4, b))]);

    let first = rt.load_segment("a").unwrap();
    let second = rt.load_segment("b").unwrap();
    assert_eq!(first[0], second[3], "float");
    assert_eq!(first[1], second[2], "tuple");
    assert_eq!(first[2], second[1], "str");
    assert_eq!(first[3], second[0], "int");

    let stats = rt.cache_stats();
    let floats = stats.iter().find(|s| s.kind == CacheKind::Float).unwrap();
    assert_eq!((floats.entries, floats.hits), (1, 1));
}

#[test]
fn reloading_a_segment_returns_the_same_objects() {
    let body = Values::new().container(b'L', 1).none().text("x");
    let mut rt = runtime(&[("m", segment(2, body))]);
    let first = rt.load_segment("m").unwrap();
    let second = rt.load_segment("m").unwrap();
    assert_eq!(first, second);
}

#[test]
fn signed_zero_and_nan_singletons_stay_distinct() {
    let body = Values::new()
        .special_float(0)
        .special_float(1)
        .special_float(2)
        .special_float(3)
        .special_float(4)
        .special_float(5);
    let mut rt = runtime(&[("m", segment(6, body))]);
    let values = rt.load_segment("m").unwrap();

    for (i, a) in values.iter().enumerate() {
        for (j, b) in values.iter().enumerate() {
            assert_eq!(i == j, a == b, "selectors {i} and {j}");
        }
    }

    let bits = |v: Value| match rt.heap().data(v) {
        Some(HeapData::Float(f)) => f.to_bits(),
        other => panic!("expected float, got {other:?}"),
    };
    assert_eq!(bits(values[0]), 0.0f64.to_bits());
    assert_eq!(bits(values[1]), (-0.0f64).to_bits());
    assert_eq!(bits(values[0]) ^ bits(values[1]), 1 << 63);
    assert!(f64::from_bits(bits(values[2])).is_sign_positive());
    assert!(f64::from_bits(bits(values[3])).is_sign_negative());
}

#[test]
fn special_floats_are_registered_in_the_float_cache() {
    let a = Values::new().special_float(1);
    let b = Values::new().float(-0.0).float(0.0).special_float(0);
    let mut rt = runtime(&[("a", segment(1, a)), ("b", segment(3, b))]);
    let minus_zero = rt.load_segment("a").unwrap()[0];
    let later = rt.load_segment("b").unwrap();
    assert_eq!(later[0], minus_zero);
    // a plain 0.0 decoded first becomes the +0.0 singleton
    assert_eq!(later[1], later[2]);
    assert_ne!(later[0], later[1]);
}

#[test]
fn back_reference_repeats_previous_slot() {
    let body = Values::new().text("x").back_ref().container(b'L', 3).float(1.5).back_ref().back_ref();
    let mut rt = runtime(&[("m", segment(3, body))]);
    let values = rt.load_segment("m").unwrap();
    assert_eq!(values[0], values[1]);

    let HeapData::List(items) = rt.heap().data(values[2]).unwrap() else {
        panic!("expected list");
    };
    assert_eq!(items[0], items[1]);
    assert_eq!(items[1], items[2]);
}

#[test]
fn back_reference_without_previous_slot_is_corrupt() {
    let err = decode_one(HostVersion::PY311, Values::new().tuple(1).back_ref()).unwrap_err();
    assert!(matches!(err, BlobError::DanglingBackReference { .. }));

    let mut rt = runtime(&[("m", segment(1, Values::new().back_ref()))]);
    assert!(matches!(
        rt.load_segment("m"),
        Err(BlobError::DanglingBackReference { .. })
    ));
}

#[test]
fn segments_are_isolated() {
    let a = Values::new().text("first").bytes(b"\x00\x01");
    let b = Values::new().int(-7);
    let mut rt = runtime(&[("A", segment(2, a)), ("B", segment(1, b))]);

    // B decodes correctly without A having been touched
    let b_values = rt.load_segment("B").unwrap();
    assert_eq!(rt.to_object(b_values[0]), ConstObject::Int(-7));
    let a_values = rt.load_segment("A").unwrap();
    assert_eq!(rt.to_object(a_values[1]), ConstObject::Bytes(vec![0, 1]));
    assert_eq!(rt.segment_names().unwrap(), ["A", "B"]);
}

#[test]
fn trailing_bytes_in_segment_are_corrupt() {
    let body = Values::new().none().none();
    let mut rt = runtime(&[("m", segment(1, body))]);
    assert!(matches!(
        rt.load_segment("m"),
        Err(BlobError::TrailingBytes { remaining: 1, .. })
    ));
}

#[test]
fn missing_segment() {
    let mut rt = runtime(&[("m", segment(0, Values::new()))]);
    assert!(matches!(rt.load_segment("other"), Err(BlobError::SegmentNotFound(_))));
}

#[test]
fn integers() {
    let v = HostVersion::PY311;
    assert_eq!(decode_one(v, Values::new().int(0)).unwrap(), ConstObject::Int(0));
    assert_eq!(decode_one(v, Values::new().int(-123_456)).unwrap(), ConstObject::Int(-123_456));
    assert_eq!(decode_one(v, Values::new().int(i64::MAX)).unwrap(), ConstObject::Int(i64::MAX));

    // 2^31 + 5 as two limbs
    assert_eq!(
        decode_one(v, Values::new().big_int(false, &[1, 5])).unwrap(),
        ConstObject::Int((1 << 31) + 5)
    );
    // -(2^93) needs more than 64 bits
    let expected: BigInt = -(BigInt::from(1u8) << 93u32);
    assert_eq!(
        decode_one(v, Values::new().big_int(true, &[1, 0, 0, 0])).unwrap(),
        ConstObject::BigInt(expected)
    );
    // magnitude above i64::MAX through the varint tags
    assert_eq!(
        decode_one(v, Values::new().tag(b'l').varint(u64::MAX)).unwrap(),
        ConstObject::BigInt(BigInt::from(u64::MAX))
    );
}

#[test]
fn cheap_integers_are_not_allocated() {
    let body = Values::new().int(-5).int(256).int(257);
    let mut rt = runtime(&[("m", segment(3, body))]);
    let values = rt.load_segment("m").unwrap();
    assert_eq!(values[0], Value::SmallInt(-5));
    assert_eq!(values[1], Value::SmallInt(256));
    assert!(matches!(values[2], Value::Ref(_)));
    assert_eq!(rt.heap().len(), 1);
}

#[test]
fn text_and_bytes_tags() {
    let v = HostVersion::PY311;
    let text = |s: &str| ConstObject::String(s.to_owned());
    assert_eq!(decode_one(v, Values::new().attr("__init__")).unwrap(), text("__init__"));
    assert_eq!(decode_one(v, Values::new().tag(b'u').cstr("h\u{e9}llo")).unwrap(), text("h\u{e9}llo"));
    assert_eq!(decode_one(v, Values::new().text("")).unwrap(), text(""));
    assert_eq!(decode_one(v, Values::new().tag(b'w').raw("\u{20ac}".as_bytes())).unwrap(), text("\u{20ac}"));
    assert_eq!(
        decode_one(v, Values::new().tag(b'c').cstr("abc")).unwrap(),
        ConstObject::Bytes(b"abc".to_vec())
    );
    assert_eq!(
        decode_one(v, Values::new().tag(b'd').raw(b"\xff")).unwrap(),
        ConstObject::Bytes(vec![0xff])
    );
    assert_eq!(
        decode_one(v, Values::new().tag(b'B').varint(2).raw(b"hi")).unwrap(),
        ConstObject::ByteArray(b"hi".to_vec())
    );
    assert!(matches!(
        decode_one(v, Values::new().tag(b'v').varint(1).raw(b"\xff")),
        Err(BlobError::InvalidText { .. })
    ));
}

#[test]
fn attribute_names_share_with_plain_text() {
    let body = Values::new().text("name").attr("name").tag(b'u').cstr("name");
    let mut rt = runtime(&[("m", segment(3, body))]);
    let values = rt.load_segment("m").unwrap();
    assert_eq!(values[0], values[1]);
    assert_eq!(values[1], values[2]);
    let Some(HeapData::Str(s)) = rt.heap().data(values[0]) else {
        panic!("expected str");
    };
    assert!(s.is_interned());
}

#[test]
fn bytearrays_are_never_shared() {
    let body = Values::new().tag(b'B').varint(1).raw(b"x").tag(b'B').varint(1).raw(b"x");
    let mut rt = runtime(&[("m", segment(2, body))]);
    let values = rt.load_segment("m").unwrap();
    assert_ne!(values[0], values[1]);
}

#[test]
fn containers() {
    let v = HostVersion::PY311;
    let dict = Values::new().container(b'D', 2).text("a").text("b").int(1).none();
    assert_eq!(
        decode_one(v, dict).unwrap().to_string(),
        "{'a': 1, 'b': None}"
    );

    let set = Values::new().container(b'S', 2).int(3).int(4);
    assert_eq!(decode_one(v, set).unwrap().to_string(), "{3, 4}");

    let nested = Values::new().container(b'L', 2).tuple(0).tuple(1).float(0.5);
    assert_eq!(decode_one(v, nested).unwrap().to_string(), "[(), (0.5,)]");

    let frozen = Values::new().container(b'P', 1).text("k");
    assert_eq!(decode_one(v, frozen).unwrap().to_string(), "frozenset({'k'})");
}

#[test]
fn empty_tuple_and_frozenset_are_singletons() {
    let body = Values::new()
        .tuple(0)
        .tuple(0)
        .container(b'P', 0)
        .container(b'P', 0);
    let mut rt = runtime(&[("m", segment(4, body))]);
    let values = rt.load_segment("m").unwrap();
    assert_eq!(values[0], values[1]);
    assert_eq!(values[2], values[3]);
    assert_ne!(values[0], values[2]);
}

#[test]
fn lists_and_dicts_dedup_shallowly() {
    let body = Values::new()
        .container(b'L', 1)
        .int(1)
        .container(b'L', 1)
        .int(1)
        .container(b'D', 1)
        .text("k")
        .none()
        .container(b'D', 1)
        .text("k")
        .none();
    let mut rt = runtime(&[("m", segment(4, body))]);
    let values = rt.load_segment("m").unwrap();
    assert_eq!(values[0], values[1]);
    assert_eq!(values[2], values[3]);
}

#[test]
fn numbers_and_ranges() {
    let v = HostVersion::PY311;
    let complex = Values::new().tag(b'j').raw(&1.0f64.to_le_bytes()).raw(&(-2.0f64).to_le_bytes());
    assert_eq!(decode_one(v, complex).unwrap().to_string(), "(1-2j)");

    let composed = Values::new().tag(b'J').float(0.0).float(3.0);
    assert_eq!(decode_one(v, composed).unwrap().to_string(), "3j");

    let slice = Values::new().tag(b':').int(1).none().int(-1);
    assert_eq!(decode_one(v, slice).unwrap().to_string(), "slice(1, None, -1)");

    let range = Values::new().tag(b';').int(0).int(10).int(2);
    assert_eq!(
        decode_one(v, range).unwrap(),
        ConstObject::Range {
            start: Box::new(ConstObject::Int(0)),
            stop: Box::new(ConstObject::Int(10)),
            step: Box::new(ConstObject::Int(2)),
        }
    );

    let bad_range = Values::new().tag(b';').int(0).text("x").int(1);
    assert!(matches!(
        decode_one(v, bad_range),
        Err(BlobError::UnexpectedKind { expected: "int", found: "str", .. })
    ));
}

#[test]
fn range_bounds_may_exceed_i64() {
    // 2**64 and 2**64 + 3 as 31-bit limbs
    let range = Values::new()
        .tag(b';')
        .big_int(false, &[4, 0, 0])
        .big_int(false, &[4, 0, 3])
        .int(1);
    let object = decode_one(HostVersion::PY311, range).unwrap();
    let two_64: BigInt = BigInt::from(1u8) << 64;
    assert_eq!(
        object,
        ConstObject::Range {
            start: Box::new(ConstObject::BigInt(two_64.clone())),
            stop: Box::new(ConstObject::BigInt(two_64 + 3)),
            step: Box::new(ConstObject::Int(1)),
        }
    );
    assert_eq!(object.to_string(), "range(18446744073709551616, 18446744073709551619)");
}

#[test]
fn named_values() {
    let v = HostVersion::PY311;
    assert_eq!(decode_one(v, Values::new().tag(b'M').raw(&[0])).unwrap(), ConstObject::Type("NoneType"));
    assert_eq!(decode_one(v, Values::new().tag(b'Q').raw(&[0])).unwrap(), ConstObject::Ellipsis);
    assert_eq!(decode_one(v, Values::new().tag(b'Q').raw(&[1])).unwrap(), ConstObject::NotImplemented);
    assert_eq!(decode_one(v, Values::new().builtin("len")).unwrap(), ConstObject::Builtin("len"));
    assert_eq!(decode_one(v, Values::new().builtin("dict")).unwrap(), ConstObject::Type("dict"));
    assert_eq!(decode_one(v, Values::new().builtin("KeyError")).unwrap(), ConstObject::Type("KeyError"));
    assert_eq!(
        decode_one(v, Values::new().tag(b'E').cstr("StopIteration")).unwrap(),
        ConstObject::Type("StopIteration")
    );
    assert!(matches!(
        decode_one(v, Values::new().builtin("nope")),
        Err(BlobError::UnknownBuiltin(_))
    ));
    assert!(matches!(
        decode_one(v, Values::new().tag(b'M').raw(&[9])),
        Err(BlobError::UnknownAnonValue { index: 9, .. })
    ));
    assert!(matches!(
        decode_one(v, Values::new().tag(b'Z').raw(&[6])),
        Err(BlobError::UnknownSpecialFloat { selector: 6, .. })
    ));
}

#[test]
fn version_info_is_built_once() {
    let body = Values::new().tag(b'Q').raw(&[2]).tag(b'Q').raw(&[2]);
    let mut rt = runtime_for(HostVersion::PY310.with_micro(4), &[("m", segment(2, body))]);
    let values = rt.load_segment("m").unwrap();
    assert_eq!(values[0], values[1]);
    assert_eq!(rt.to_object(values[0]).to_string(), "(3, 10, 4, 'final', 0)");
}

#[test]
fn version_info_is_the_cached_tuple() {
    let literal = || Values::new().tuple(5).int(3).int(11).int(0).text("final").int(0);
    let mut rt = runtime(&[
        (BYTECODE_SEGMENT, segment(1, Values::new().tag(b'Q').raw(&[2]))),
        ("a", segment(1, literal())),
        ("b", segment(2, Values::new().tag(b'Q').raw(&[2]).raw(&literal().into_bytes()))),
    ]);
    let info = rt.load_segment(BYTECODE_SEGMENT).unwrap()[0];
    assert_eq!(rt.load_segment("a").unwrap()[0], info);
    assert_eq!(rt.load_segment("b").unwrap(), [info, info]);
}

#[test]
fn builtins_follow_host_version() {
    assert_eq!(
        decode_one(HostVersion::PY27, Values::new().builtin("xrange")).unwrap(),
        ConstObject::Type("xrange")
    );
    assert!(decode_one(HostVersion::PY311, Values::new().builtin("xrange")).is_err());
    assert!(matches!(
        decode_one(HostVersion::PY27, Values::new().tag(b'M').raw(&[8])),
        Ok(ConstObject::Type("file"))
    ));
}

#[test]
fn typing_tags_are_version_gated() {
    let alias = || Values::new().tag(b'A').builtin("list").builtin("int");
    assert_eq!(decode_one(HostVersion::PY39, alias()).unwrap().to_string(), "list[int]");
    assert!(matches!(
        decode_one(HostVersion::PY38, alias()),
        Err(BlobError::TagNotSupported { tag: 'A', .. })
    ));

    let union = || Values::new().tag(b'H').tuple(2).builtin("int").builtin("str");
    assert_eq!(decode_one(HostVersion::PY310, union()).unwrap().to_string(), "int | str");
    assert!(matches!(
        decode_one(HostVersion::PY39, union()),
        Err(BlobError::TagNotSupported { tag: 'H', .. })
    ));
}

#[test]
fn raw_data_spans_point_into_the_payload() {
    let body = Values::new().tag(b'X').varint(3).raw(b"abc").none();
    let mut rt = runtime(&[("m", segment(2, body))]);
    let values = rt.load_segment("m").unwrap();
    let Value::Raw(span) = values[0] else {
        panic!("expected raw data, got {:?}", values[0]);
    };
    assert_eq!(rt.raw_data(span), Some(&b"abc"[..]));
    assert_eq!(values[1], Value::None);
}

fn code_body(version: HostVersion) -> Values {
    let mut body = Values::new().tag(b'C').i32(12).i32(0x20).attr("gen");
    if version >= HostVersion::PY311 {
        body = body.attr("Outer.gen");
    }
    body = body.tuple(2).attr("a").attr("b").tuple(0).i32(1);
    if version.major >= 3 {
        body = body.i32(1);
    }
    if version >= HostVersion::PY38 {
        body = body.i32(0);
    }
    body
}

#[test]
fn code_descriptor_layout_follows_version() {
    for version in [HostVersion::PY27, HostVersion::PY38, HostVersion::PY311] {
        let mut rt = runtime_for(version, &[("m", segment(1, code_body(version)))]);
        let values = rt.load_segment("m").unwrap();
        let code = rt.heap().code(values[0]).unwrap();
        assert_eq!(code.line(), 12);
        assert!(code.is_generator());
        assert_eq!(code.arg_count(), 1);
        assert_eq!(code.qualname().is_some(), version >= HostVersion::PY311, "{version}");
        assert_eq!(code.kw_only_count().is_some(), version.major >= 3, "{version}");
        assert_eq!(code.pos_only_count().is_some(), version >= HostVersion::PY38, "{version}");

        let ConstObject::Code(object) = rt.to_object(values[0]) else {
            panic!("expected code object");
        };
        assert_eq!(object.name, "gen");
        assert_eq!(object.arg_names, ["a", "b"]);
        assert!(object.free_vars.is_empty());
    }
}

#[test]
fn code_descriptor_rejects_wrong_field_kinds() {
    let body = Values::new().tag(b'C').i32(1).i32(0).int(3);
    assert!(matches!(
        decode_one(HostVersion::PY311, body),
        Err(BlobError::UnexpectedKind { expected: "str", found: "int", .. })
    ));
}

#[test]
fn bytecode_segment_skips_dedup() {
    let body = Values::new().float(1.25).float(1.25).text("x").text("x");
    let mut rt = runtime(&[(BYTECODE_SEGMENT, segment(4, body.clone())), ("m", segment(4, body))]);

    let bytecode = rt.load_segment(BYTECODE_SEGMENT).unwrap();
    assert_ne!(bytecode[0], bytecode[1]);
    assert_ne!(bytecode[2], bytecode[3]);
    assert!(rt.cache_stats().iter().all(|s| s.entries == 0));

    let module = rt.load_segment("m").unwrap();
    assert_eq!(module[0], module[1]);
    assert_eq!(module[2], module[3]);
}

#[test]
fn bytecode_singletons_after_cached_segments() {
    let mut rt = runtime(&[
        ("m1", segment(1, Values::new().float(-0.0))),
        (BYTECODE_SEGMENT, segment(2, Values::new().special_float(1).float(-0.0))),
        ("m2", segment(1, Values::new().special_float(1))),
    ]);
    let cached = rt.load_segment("m1").unwrap()[0];
    let bytecode = rt.load_segment(BYTECODE_SEGMENT).unwrap();
    assert_eq!(bytecode[0], cached);
    // plain floats in the bytecode segment are still private copies
    assert_ne!(bytecode[1], cached);
    assert_eq!(rt.load_segment("m2").unwrap()[0], cached);
}

#[test]
fn corrupt_tags() {
    let v = HostVersion::PY311;
    assert!(matches!(
        decode_one(v, Values::new().tag(b'.')),
        Err(BlobError::CorruptMarker { .. })
    ));
    assert!(matches!(
        decode_one(v, Values::new().tag(b'?')),
        Err(BlobError::UnknownTag { tag: b'?', .. })
    ));
    assert!(matches!(
        decode_one(v, Values::new().tag(b'i').varint(1)),
        Err(BlobError::TagNotSupported { tag: 'i', .. })
    ));
    assert!(matches!(
        decode_one(v, Values::new().tuple(3).none()),
        Err(BlobError::UnexpectedEof { .. })
    ));
}

#[test]
fn deep_nesting_is_rejected() {
    let depth = 300;
    let mut body = Values::new();
    for _ in 0..depth {
        body = body.tuple(1);
    }
    body = body.none();
    let err = decode_one(HostVersion::PY311, body).unwrap_err();
    assert!(matches!(err, BlobError::NestingTooDeep { limit: 256, .. }));
}

#[test]
fn unsupported_host_version_fails_when_located() {
    let mut rt = runtime_for(HostVersion::new(3, 2), &[("m", segment(1, Values::new().none()))]);
    assert!(matches!(rt.load_segment("m"), Err(BlobError::UnsupportedVersion(_))));
    assert!(!rt.is_ready());
}
