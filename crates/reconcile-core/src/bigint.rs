//! Big-integer conversions (§4.1 `toBig`/`ToString`/`ToUint64`/`ToBytes`).
//!
//! The original accepts `{string, uint64, []byte}` and rejects everything
//! else at runtime with `UnsupportedType`. Rust gives us that check for free
//! via the trait system for the three supported inputs; `from_dyn` keeps the
//! runtime-checked entry point for callers (e.g. the CLI) that only have a
//! loosely-typed value in hand.

use crate::error::{ReconcileError, Result};
use num_bigint::BigUint;

/// A big, unsigned integer with the original's `ToString`/`ToUint64`/
/// `ToBytes` surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconBigInt(BigUint);

impl ReconBigInt {
    pub fn from_str_bytes(s: &str) -> Self {
        Self(BigUint::from_bytes_be(s.as_bytes()))
    }

    pub fn from_u64(v: u64) -> Self {
        Self(BigUint::from(v))
    }

    pub fn from_bytes(b: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(b))
    }

    /// Inverse of `from_str_bytes` — interprets the big-endian byte form as
    /// a UTF-8 string, lossily, matching the Go `big.Int.Bytes()` ->
    /// `string()` cast.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0.to_bytes_be()).into_owned()
    }

    pub fn to_u64(&self) -> u64 {
        // Matches Go's big.Int.Uint64(): low 64 bits, no overflow check.
        let bytes = self.0.to_bytes_le();
        let mut buf = [0u8; 8];
        let n = bytes.len().min(8);
        buf[..n].copy_from_slice(&bytes[..n]);
        u64::from_le_bytes(buf)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }
}

/// Runtime-checked conversion for callers holding a dynamically-typed
/// value (mirrors the Go `ToBigInt(interface{})` entry point).
pub enum DynValue<'a> {
    Str(&'a str),
    U64(u64),
    Bytes(&'a [u8]),
    Other(&'static str),
}

pub fn to_big_dyn(input: DynValue<'_>) -> Result<ReconBigInt> {
    match input {
        DynValue::Str(s) => Ok(ReconBigInt::from_str_bytes(s)),
        DynValue::U64(v) => Ok(ReconBigInt::from_u64(v)),
        DynValue::Bytes(b) => Ok(ReconBigInt::from_bytes(b)),
        DynValue::Other(type_name) => Err(ReconcileError::UnsupportedType(type_name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_u64() {
        let b = ReconBigInt::from_u64(424242);
        assert_eq!(b.to_u64(), 424242);
    }

    #[test]
    fn round_trips_string() {
        let b = ReconBigInt::from_str_bytes("hello");
        assert_eq!(b.to_string_lossy(), "hello");
    }

    #[test]
    fn rejects_unsupported_type() {
        let err = to_big_dyn(DynValue::Other("f64")).unwrap_err();
        assert!(matches!(err, ReconcileError::UnsupportedType(_)));
    }
}
