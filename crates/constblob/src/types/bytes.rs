//! Repr formatting for `bytes` and `bytearray` constants.

use std::fmt::Write;

use super::str::{pick_quote, simple_escape};

/// Writes a host-compatible repr for bytes: `b'...'`, or `b"..."` when that
/// avoids escaping a quote. Bytes outside printable ASCII become `\xNN`.
pub fn bytes_repr_fmt(bytes: &[u8], f: &mut impl Write) -> std::fmt::Result {
    let quote = pick_quote(bytes.contains(&b'\''), bytes.contains(&b'"'));
    write!(f, "b{quote}")?;
    for &byte in bytes {
        let c = char::from(byte);
        match simple_escape(c, quote) {
            Some(escaped) => f.write_str(escaped)?,
            None if byte == b' ' || byte.is_ascii_graphic() => f.write_char(c)?,
            None => write!(f, "\\x{byte:02x}")?,
        }
    }
    f.write_char(quote)
}
