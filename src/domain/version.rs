//! Lenient version value object
//!
//! Dependency versions come from manifests in many shapes: exact versions,
//! range specs (`^4.17.1`, `>=2.25.0,<3.0.0`), or wildcards. The matcher
//! needs a total ordering over whatever it can parse, and an explicit
//! "unparsable" signal for everything else so the version-affects
//! predicate can fail open.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Error returned when a version string cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparsable version: {0}")]
pub struct VersionParseError(pub String);

/// A parsed dotted-numeric version, e.g. `1.2.3` or `4.17.1-beta.1`.
///
/// Ordering compares numeric components left to right with missing
/// trailing components treated as zero; a pre-release sorts before the
/// same release without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    parts: Vec<u64>,
    pre: Option<String>,
}

impl Version {
    /// Parse an exact version string.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(VersionParseError(input.to_string()));
        }

        // Split off pre-release / build metadata.
        let (numeric, pre) = match trimmed.find(['-', '+']) {
            Some(idx) => {
                let (head, tail) = trimmed.split_at(idx);
                let pre = if tail.starts_with('-') {
                    Some(tail[1..].to_string())
                } else {
                    None // build metadata is ignored for ordering
                };
                (head, pre)
            }
            None => (trimmed, None),
        };

        let mut parts = Vec::new();
        for piece in numeric.split('.') {
            let value: u64 = piece
                .parse()
                .map_err(|_| VersionParseError(input.to_string()))?;
            parts.push(value);
        }
        if parts.is_empty() {
            return Err(VersionParseError(input.to_string()));
        }

        Ok(Self { parts, pre })
    }

    /// Parse a version out of a manifest spec string.
    ///
    /// Strips range operators (`^`, `~`, `>=`, `<=`, `>`, `<`, `=`) and
    /// keeps only the first version of a compound spec (`,`-separated
    /// ranges, hyphen ranges, `||` alternatives). `*` and `latest` remain
    /// unparsable on purpose.
    pub fn parse_lenient(spec: &str) -> Result<Self, VersionParseError> {
        let mut s = spec.trim();
        for prefix in [">=", "<=", "==", "~=", "^", "~", ">", "<", "="] {
            if let Some(stripped) = s.strip_prefix(prefix) {
                s = stripped.trim();
                break;
            }
        }
        for separator in [",", "||", " "] {
            if let Some(idx) = s.find(separator) {
                s = &s[..idx];
            }
        }
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        match &self.pre {
            Some(pre) => write!(f, "{}-{}", joined, pre),
            None => write!(f, "{}", joined),
        }
    }
}
