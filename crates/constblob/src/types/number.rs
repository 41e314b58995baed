//! Repr formatting for float and complex constants.

use std::fmt::Write;

/// Writes a float the way the host's `repr()` does.
///
/// Shortest round-tripping digits; positional notation for decimal exponents
/// in `-4..16`, scientific notation with a signed two-digit exponent otherwise.
pub fn float_repr_fmt(value: f64, f: &mut impl Write) -> std::fmt::Result {
    if value.is_nan() {
        return f.write_str("nan");
    }
    if value.is_infinite() {
        return f.write_str(if value > 0.0 { "inf" } else { "-inf" });
    }
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..16).contains(&exponent) {
        let plain = value.to_string();
        f.write_str(&plain)?;
        if !plain.contains('.') {
            f.write_str(".0")?;
        }
        Ok(())
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(f, "{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

/// Float repr without a trailing `.0`, as used inside complex reprs.
fn complex_part(value: f64) -> String {
    let mut out = String::new();
    // Writing to String never fails
    let _ = float_repr_fmt(value, &mut out);
    match out.strip_suffix(".0") {
        Some(trimmed) => trimmed.to_owned(),
        None => out,
    }
}

/// Writes a complex number the way the host's `repr()` does: `2j`, `(1+2j)`.
pub fn complex_repr_fmt(real: f64, imag: f64, f: &mut impl Write) -> std::fmt::Result {
    let imag_str = complex_part(imag);
    if real == 0.0 && real.is_sign_positive() {
        return write!(f, "{imag_str}j");
    }
    let real_str = complex_part(real);
    let sign = if imag_str.starts_with('-') { "" } else { "+" };
    write!(f, "({real_str}{sign}{imag_str}j)")
}
