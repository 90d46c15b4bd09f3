//! Fixed-width integer keys and the byte-packed tuples built from them.
//!
//! The key width `W` is a build-time choice (§9 Design Notes: a compile-time
//! constant in the source this was distilled from). Rather than a
//! preprocessor flag, it is a `const generic`-free runtime `KeyWidth` enum
//! persisted in the environment header (`crate::header`) so a binary can
//! refuse to open a store bootstrapped with a different width.

use crate::error::{CResult, Error};

/// Permissible key widths, in bytes. The on-disk format is not portable
/// across widths; changing `W` requires a dump/reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWidth {
    W4,
    W5,
    W8,
}

impl KeyWidth {
    pub fn bytes(self) -> usize {
        match self {
            KeyWidth::W4 => 4,
            KeyWidth::W5 => 5,
            KeyWidth::W8 => 8,
        }
    }

    pub fn as_u8(self) -> u8 {
        self.bytes() as u8
    }

    pub fn from_u8(value: u8) -> CResult<Self> {
        match value {
            4 => Ok(KeyWidth::W4),
            5 => Ok(KeyWidth::W5),
            8 => Ok(KeyWidth::W8),
            other => Err(Error::InvalidArgument(format!("unsupported key width {other}"))),
        }
    }
}

impl Default for KeyWidth {
    fn default() -> Self {
        KeyWidth::W8
    }
}

/// A single interned term key. Reserved value 0 is the null/sentinel key;
/// the first key ever allocated is 1. Key 1 is additionally reserved as the
/// default graph's context key (§9 Design Notes Open Question, fixed).
pub type Key = u64;

pub const NULL_KEY: Key = 0;
pub const DEFAULT_GRAPH_KEY: Key = 1;
pub const FIRST_ALLOCATABLE_KEY: Key = 2;

/// Encodes a `Key` into exactly `width` big-endian bytes, trapping overflow
/// the same way the allocator's big-endian-counter successor rule does.
pub fn encode_key(key: Key, width: KeyWidth) -> CResult<Vec<u8>> {
    let w = width.bytes();
    let full = key.to_be_bytes(); // 8 bytes, big-endian
    let start = 8 - w;
    if key >> (w * 8) != 0 {
        return Err(Error::KeySpaceExhausted);
    }
    Ok(full[start..].to_vec())
}

pub fn decode_key(bytes: &[u8]) -> CResult<Key> {
    if bytes.is_empty() || bytes.len() > 8 {
        return Err(Error::Corrupted(format!("key of invalid width {}", bytes.len())));
    }
    let mut buf = [0u8; 8];
    buf[8 - bytes.len()..].copy_from_slice(bytes);
    Ok(Key::from_be_bytes(buf))
}

/// Returns the big-endian-counter successor of `key`, or `KeySpaceExhausted`
/// once the counter saturates the configured width.
pub fn next_key(key: Key, width: KeyWidth) -> CResult<Key> {
    let max = if width.bytes() == 8 { u64::MAX } else { (1u64 << (width.bytes() * 8)) - 1 };
    if key >= max {
        return Err(Error::KeySpaceExhausted);
    }
    Ok(key + 1)
}

/// An ordered (subject, predicate, object) triple of keys, byte-packed to
/// `3 * W` bytes for use as a primary-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripleKey {
    pub s: Key,
    pub p: Key,
    pub o: Key,
}

impl TripleKey {
    pub const NULL: TripleKey = TripleKey { s: NULL_KEY, p: NULL_KEY, o: NULL_KEY };

    pub fn new(s: Key, p: Key, o: Key) -> Self {
        Self { s, p, o }
    }

    pub fn is_tombstone(&self) -> bool {
        *self == Self::NULL
    }

    pub fn encode(&self, width: KeyWidth) -> CResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(width.bytes() * 3);
        buf.extend(encode_key(self.s, width)?);
        buf.extend(encode_key(self.p, width)?);
        buf.extend(encode_key(self.o, width)?);
        Ok(buf)
    }

    pub fn decode(bytes: &[u8], width: KeyWidth) -> CResult<Self> {
        let w = width.bytes();
        if bytes.len() != w * 3 {
            return Err(Error::Corrupted(format!(
                "triple key has {} bytes, expected {}",
                bytes.len(),
                w * 3
            )));
        }
        Ok(Self {
            s: decode_key(&bytes[0..w])?,
            p: decode_key(&bytes[w..2 * w])?,
            o: decode_key(&bytes[2 * w..3 * w])?,
        })
    }
}

/// A pair of keys packed for one of the three compound indices. The field
/// order is fixed per index to enable prefix scans:
///
/// - `s_to_po`: `(p, o)`
/// - `p_to_so`: `(s, o)`
/// - `o_to_sp`: `(s, p)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoubleKey {
    pub a: Key,
    pub b: Key,
}

impl DoubleKey {
    pub fn new(a: Key, b: Key) -> Self {
        Self { a, b }
    }

    pub fn encode(&self, width: KeyWidth) -> CResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(width.bytes() * 2);
        buf.extend(encode_key(self.a, width)?);
        buf.extend(encode_key(self.b, width)?);
        Ok(buf)
    }

    pub fn decode(bytes: &[u8], width: KeyWidth) -> CResult<Self> {
        let w = width.bytes();
        if bytes.len() != w * 2 {
            return Err(Error::Corrupted(format!(
                "double key has {} bytes, expected {}",
                bytes.len(),
                w * 2
            )));
        }
        Ok(Self { a: decode_key(&bytes[0..w])?, b: decode_key(&bytes[w..2 * w])? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_key_all_widths() {
        for width in [KeyWidth::W4, KeyWidth::W5, KeyWidth::W8] {
            let max = if width.bytes() == 8 { u64::MAX } else { (1u64 << (width.bytes() * 8)) - 1 };
            for key in [0, 1, 255, max] {
                let bytes = encode_key(key, width).unwrap();
                assert_eq!(bytes.len(), width.bytes());
                assert_eq!(decode_key(&bytes).unwrap(), key);
            }
        }
    }

    #[test]
    fn encode_rejects_overflow_for_width() {
        assert!(encode_key(1 << 32, KeyWidth::W4).is_err());
        assert!(encode_key(1u64 << 40, KeyWidth::W5).is_ok());
        assert!(encode_key(1u64 << 41, KeyWidth::W5).is_err());
    }

    #[test]
    fn next_key_is_monotonic_and_exhausts() {
        let w = KeyWidth::W4;
        let mut k = FIRST_ALLOCATABLE_KEY;
        for _ in 0..10 {
            let nk = next_key(k, w).unwrap();
            assert!(nk > k);
            k = nk;
        }
        let max = (1u64 << 32) - 1;
        assert!(next_key(max, w).is_err());
    }

    #[test]
    fn triple_key_roundtrip() {
        let width = KeyWidth::W5;
        let tk = TripleKey::new(1, 2, 3);
        let bytes = tk.encode(width).unwrap();
        assert_eq!(bytes.len(), width.bytes() * 3);
        assert_eq!(TripleKey::decode(&bytes, width).unwrap(), tk);
    }

    #[test]
    fn double_key_roundtrip() {
        let width = KeyWidth::W8;
        let dk = DoubleKey::new(42, 7);
        let bytes = dk.encode(width).unwrap();
        assert_eq!(DoubleKey::decode(&bytes, width).unwrap(), dk);
    }
}
