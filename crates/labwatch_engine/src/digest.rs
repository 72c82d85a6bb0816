use std::fmt;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of normalized page text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub const HEX_LEN: usize = 64;

    pub fn of_text(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let mut hex = String::with_capacity(Self::HEX_LEN);
        for byte in digest.iter() {
            use std::fmt::Write;
            let _ = write!(&mut hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Parse a stored digest, ignoring surrounding whitespace.
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim();
        let valid = hex.len() == Self::HEX_LEN
            && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
