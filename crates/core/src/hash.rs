//! [`ContentHash`]: a deterministic fingerprint over file bytes.
//!
//! A non-cryptographic 32-bit fold is sufficient here: a hash match only ever
//! suppresses a redundant push, it never substitutes for reading the actual bytes
//! before a write. Built by truncating a `blake3` digest rather than pulling in a
//! second hashing crate, since `blake3` is already part of the dependency graph.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ContentHash([u8; 4]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        let digest = blake3::hash(bytes);
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest.as_bytes()[..4]);
        Self(out)
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use base64::Engine;
        write!(f, "{}", base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(ContentHash::of(b"hello"), ContentHash::of(b"hello"));
    }

    #[test]
    fn differs_on_different_input() {
        assert_ne!(ContentHash::of(b"hello"), ContentHash::of(b"world"));
    }

    #[test]
    fn empty_input_is_stable() {
        let a = ContentHash::of(b"");
        let b = ContentHash::of(b"");
        assert_eq!(a, b);
    }
}
