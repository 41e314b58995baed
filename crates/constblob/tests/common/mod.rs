//! Blob writer shared by the integration tests.
//!
//! Mirrors the compiler side of the format closely enough to produce every
//! tag the decoder understands.

#![allow(dead_code)]

/// Builder for a stream of tagged constants.
#[derive(Debug, Default, Clone)]
pub struct Values(Vec<u8>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn tag(self, tag: u8) -> Self {
        self.raw(&[tag])
    }

    pub fn varint(mut self, mut value: u64) -> Self {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.0.push(byte);
                return self;
            }
            self.0.push(byte | 0x80);
        }
    }

    pub fn i32(self, value: i32) -> Self {
        self.raw(&value.to_le_bytes())
    }

    pub fn cstr(mut self, text: &str) -> Self {
        self.0.extend_from_slice(text.as_bytes());
        self.0.push(0);
        self
    }

    /// `l`/`q` integer.
    pub fn int(self, value: i64) -> Self {
        if value < 0 {
            self.tag(b'q').varint(value.unsigned_abs())
        } else {
            self.tag(b'l').varint(value.unsigned_abs())
        }
    }

    /// `G`/`g` integer from limbs, most significant first.
    pub fn big_int(self, negative: bool, limbs: &[u32]) -> Self {
        let mut out = self.tag(if negative { b'g' } else { b'G' }).varint(limbs.len() as u64);
        for &limb in limbs {
            out = out.varint(u64::from(limb));
        }
        out
    }

    pub fn float(self, value: f64) -> Self {
        self.tag(b'f').raw(&value.to_le_bytes())
    }

    pub fn special_float(self, selector: u8) -> Self {
        self.tag(b'Z').raw(&[selector])
    }

    /// `v` sized text.
    pub fn text(self, text: &str) -> Self {
        self.tag(b'v').varint(text.len() as u64).raw(text.as_bytes())
    }

    /// `a` interned attribute name.
    pub fn attr(self, text: &str) -> Self {
        self.tag(b'a').cstr(text)
    }

    /// `b` sized bytes.
    pub fn bytes(self, bytes: &[u8]) -> Self {
        self.tag(b'b').varint(bytes.len() as u64).raw(bytes)
    }

    pub fn none(self) -> Self {
        self.tag(b'n')
    }

    pub fn back_ref(self) -> Self {
        self.tag(b'p')
    }

    /// Header of a sized container; the elements follow.
    pub fn container(self, tag: u8, len: usize) -> Self {
        self.tag(tag).varint(len as u64)
    }

    pub fn tuple(self, len: usize) -> Self {
        self.container(b'T', len)
    }

    pub fn builtin(self, name: &str) -> Self {
        self.tag(b'O').cstr(name)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Segment body: `u16` count followed by the encoded constants.
pub fn segment(count: u16, values: Values) -> Vec<u8> {
    let mut body = count.to_le_bytes().to_vec();
    body.extend_from_slice(&values.into_bytes());
    body
}

/// Payload made of named segment records.
pub fn payload(segments: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut payload = Vec::new();
    for (name, body) in segments {
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);
        payload.extend_from_slice(&u32::try_from(body.len()).unwrap().to_le_bytes());
        payload.extend_from_slice(body);
    }
    payload
}

/// Complete blob: checksum, payload size, payload.
pub fn blob(segments: &[(&str, Vec<u8>)]) -> Vec<u8> {
    wrap(&payload(segments))
}

/// Puts a correct header in front of `payload`.
pub fn wrap(payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(payload.len() + constblob::blob::HEADER_LEN);
    blob.extend_from_slice(&constblob::blob::payload_checksum(payload).to_le_bytes());
    blob.extend_from_slice(&u32::try_from(payload.len()).unwrap().to_le_bytes());
    blob.extend_from_slice(payload);
    blob
}
