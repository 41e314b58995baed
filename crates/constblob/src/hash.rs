//! Fast, deterministic, non-cryptographic hash over raw byte spans.
//!
//! This is the multiplicative string hash the host used before hash
//! randomisation. It is only ever used to bucket constants in the dedup
//! caches, so collisions cost a comparison and nothing else.

/// Hashes `bytes` into a signed host-style hash value.
///
/// Conventions:
/// * empty input hashes to `0`
/// * `-1` is reserved by the host as an error sentinel and is remapped to `-2`
#[must_use]
pub fn fast_hash_bytes(bytes: &[u8]) -> i64 {
    let Some(&first) = bytes.first() else {
        return 0;
    };
    let mut x = i64::from(first) << 7;
    for &byte in bytes {
        x = x.wrapping_mul(1_000_003) ^ i64::from(byte);
    }
    // lengths never reach i64::MAX, the fallback only keeps the cast lossless
    x ^= i64::try_from(bytes.len()).unwrap_or(i64::MAX);
    if x == -1 { -2 } else { x }
}

/// [`fast_hash_bytes`] reinterpreted as the unsigned hash hashbrown expects.
#[inline]
#[must_use]
pub fn fast_hash_u64(bytes: &[u8]) -> u64 {
    u64::from_ne_bytes(fast_hash_bytes(bytes).to_ne_bytes())
}
