//! Text constants and their repr formatting.

use std::fmt::Write;

/// A decoded text constant.
///
/// `interned` is set once any `a`-tagged (attribute name) occurrence of the
/// same text has been decoded; the canonical object is shared either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str {
    text: String,
    interned: bool,
}

impl Str {
    #[must_use]
    pub fn new(text: String) -> Self {
        Self { text, interned: false }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_interned(&self) -> bool {
        self.interned
    }

    pub(crate) fn mark_interned(&mut self) {
        self.interned = true;
    }
}

/// Quote character for a repr: single quotes unless the content contains
/// `'` and no `"`.
pub(crate) fn pick_quote(has_single: bool, has_double: bool) -> char {
    if has_single && !has_double { '"' } else { '\'' }
}

/// Backslash escape shared by text and bytes reprs, if `c` needs one.
pub(crate) fn simple_escape(c: char, quote: char) -> Option<&'static str> {
    match c {
        '\\' => Some("\\\\"),
        '\n' => Some("\\n"),
        '\r' => Some("\\r"),
        '\t' => Some("\\t"),
        '\'' if quote == '\'' => Some("\\'"),
        '"' if quote == '"' => Some("\\\""),
        _ => None,
    }
}

/// Writes a host-compatible repr string for text to a formatter.
///
/// Control characters use `\xNN`, `\uNNNN` or `\UNNNNNNNN` escapes.
pub fn string_repr_fmt(s: &str, f: &mut impl Write) -> std::fmt::Result {
    let quote = pick_quote(s.contains('\''), s.contains('"'));
    f.write_char(quote)?;
    for c in s.chars() {
        if let Some(escaped) = simple_escape(c, quote) {
            f.write_str(escaped)?;
            continue;
        }
        let code = u32::from(c);
        if !c.is_control() {
            f.write_char(c)?;
        } else if code < 0x100 {
            write!(f, "\\x{code:02x}")?;
        } else if code < 0x1_0000 {
            write!(f, "\\u{code:04x}")?;
        } else {
            write!(f, "\\U{code:08x}")?;
        }
    }
    f.write_char(quote)
}
