//! Element key adapters (§3 Entity: Element, §9 "Polymorphic element type").
//!
//! Elements are byte strings. Values arriving as strings or integers get a
//! stable canonical byte encoding here — never a language's default `Debug`/
//! `Display` — so the digest (§4.1) is reproducible independent of which
//! side of the wire formatted it.

/// A canonical byte-string key for an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(Vec<u8>);

impl ElementKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Canonical encoding for strings: the UTF-8 bytes verbatim.
    pub fn from_str(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }

    /// Canonical encoding for integers: little-endian fixed width, per
    /// spec.md §4.1's byte/int conversion rule.
    pub fn from_u64(v: u64) -> Self {
        Self(v.to_le_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ElementKey {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl AsRef<[u8]> for ElementKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u64_roundtrip_is_little_endian() {
        let key = ElementKey::from_u64(1);
        assert_eq!(key.as_bytes(), &[1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn str_encoding_is_utf8_bytes() {
        let key = ElementKey::from_str("abc");
        assert_eq!(key.as_bytes(), b"abc");
    }
}
