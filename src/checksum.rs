//! Fingerprints of resolved schema trees
//!
//! Trees keep their authored key order (`serde_json/preserve_order`), so
//! resolving the same (format, version) twice serializes to identical bytes
//! and yields the same checksum.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex SHA-256 of a tree's compact JSON form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn of(tree: &Value) -> Self {
        let mut hasher = Sha256::new();
        // Writing into a hasher cannot fail and a Value always has string keys.
        if serde_json::to_writer(HashWriter(&mut hasher), tree).is_err() {
            return Self(String::new());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading 12 hex digits, as printed by the CLI
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }

    /// Whether `tree` hashes to this checksum
    pub fn matches(&self, tree: &Value) -> bool {
        Self::of(tree) == *self
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streams serializer output straight into the digest
struct HashWriter<'a>(&'a mut Sha256);

impl std::io::Write for HashWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
