//! Version ordinals
//!
//! Format versions are dotted numeric tags (`1.21.40`, `1.16.100`). They are
//! compared segment by segment as integers, never as strings, so that
//! `1.10.0` sorts after `1.9.0`. Missing trailing segments count as zero.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Result, SchemaError};

/// A parsed, totally ordered version tag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionOrdinal {
    /// Segments as written (used for display)
    segments: Vec<u64>,
    /// Number of segments left after dropping trailing zeros
    significant: usize,
}

impl VersionOrdinal {
    /// Parse a dotted numeric tag such as `"1.21.40"`
    pub fn parse(tag: &str) -> Result<Self> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(SchemaError::InvalidVersionFormat(tag.to_string()));
        }

        let segments = trimmed
            .split('.')
            .map(|segment| {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                segment.parse::<u64>().ok()
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SchemaError::InvalidVersionFormat(tag.to_string()))?;

        Ok(Self::from_segments(segments))
    }

    /// Build an ordinal from raw segments
    pub fn from_segments(segments: Vec<u64>) -> Self {
        let significant = segments
            .iter()
            .rposition(|&s| s != 0)
            .map_or(0, |last| last + 1);
        Self { segments, significant }
    }

    /// Segments as declared
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    fn key(&self) -> &[u64] {
        &self.segments[..self.significant]
    }

    /// Three-way comparison, zero-padding the shorter tag
    pub fn compare(&self, other: &Self) -> Ordering {
        // With trailing zeros stripped, a strict prefix always has the smaller
        // padded value, so slice ordering is exact.
        self.key().cmp(other.key())
    }
}

impl fmt::Display for VersionOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionOrdinal {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionOrdinal {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionOrdinal> for String {
    fn from(value: VersionOrdinal) -> Self {
        value.to_string()
    }
}

impl PartialEq for VersionOrdinal {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for VersionOrdinal {}

impl Hash for VersionOrdinal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for VersionOrdinal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionOrdinal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(tag: &str) -> VersionOrdinal {
        VersionOrdinal::parse(tag).unwrap()
    }

    #[test]
    fn test_version_parsing() {
        let version = v("1.21.40");
        assert_eq!(version.segments(), &[1, 21, 40]);
        assert_eq!(version.to_string(), "1.21.40");
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(v("1.10.0").compare(&v("1.9.0")), Ordering::Greater);
        assert_eq!(v("1.16.100").compare(&v("1.16.20")), Ordering::Greater);
        assert!(v("1.9.0") < v("1.10.0"));
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("1.2").compare(&v("1.2.0.0")), Ordering::Equal);
        assert!(v("1") < v("1.0.1"));
        assert!(v("2") > v("1.99.99"));
    }

    #[test]
    fn test_hash_agrees_with_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(v("1.2"));
        assert!(set.contains(&v("1.2.0")));
    }

    #[test]
    fn test_more_segments_supported() {
        assert!(v("1.20.0.1") > v("1.20.0"));
        assert_eq!(v("1.20.0.1").segments().len(), 4);
    }

    #[test]
    fn test_invalid_versions() {
        for bad in ["", "   ", "1..2", "1.a.0", "v1.2.3", "1.2.", "-1.0", "+1.0", "1.2.3-beta"] {
            let err = VersionOrdinal::parse(bad).unwrap_err();
            assert!(matches!(err, SchemaError::InvalidVersionFormat(_)), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_serde_uses_string_form() {
        let version: VersionOrdinal = serde_json::from_str("\"1.16.100\"").unwrap();
        assert_eq!(version, v("1.16.100"));
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"1.16.100\"");
        assert!(serde_json::from_str::<VersionOrdinal>("\"one\"").is_err());
    }
}
