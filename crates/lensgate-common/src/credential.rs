//! Server-held vendor credential.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Vendor API key.
///
/// The value is only reachable through [`ApiKey::expose`]; `Debug` and `Display`
/// print a mask, and the backing buffer is wiped when the key is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a raw value. Blank input yields `None`.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let mut raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            raw.zeroize();
            return None;
        }
        let key = Self(trimmed.to_string());
        raw.zeroize();
        Some(key)
    }

    /// Reads the key from an environment variable.
    pub fn from_env(name: &str) -> Option<Self> {
        std::env::var(name).ok().and_then(Self::new)
    }

    /// Raw value, for attaching to the outbound vendor request only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short non-reversible hint for diagnostics: the last four characters of a long key.
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() < 12 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
