//! Object identifier derivation
//!
//! An object identifier is the first N segments of a file's canonical path
//! (after an optional header segment is stripped), joined with `-`.

use crate::error::{ApiError, AssemblyError};
use crate::types::{Identifier, IDENTIFIER_SEPARATOR};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

/// Number of leading path segments forming an identifier. Always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ObjectLevel(NonZeroUsize);

impl ObjectLevel {
    pub const ONE: ObjectLevel = ObjectLevel(NonZeroUsize::MIN);

    pub fn new(level: i64) -> Result<Self, ApiError> {
        usize::try_from(level)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(ObjectLevel)
            .ok_or(ApiError::InvalidObjectLevel(level))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl TryFrom<i64> for ObjectLevel {
    type Error = ApiError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        ObjectLevel::new(level)
    }
}

impl From<ObjectLevel> for i64 {
    fn from(level: ObjectLevel) -> Self {
        level.get() as i64
    }
}

impl fmt::Display for ObjectLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the identifier for `canonical_path` at `level`.
///
/// Pure: the same path and level always give the same identifier.
pub fn resolve_identifier(canonical_path: &str, level: ObjectLevel) -> Result<Identifier, AssemblyError> {
    let segments: Vec<&str> = canonical_path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < level.get() {
        return Err(AssemblyError::MalformedPath {
            path: canonical_path.to_string(),
            level: level.get(),
            segments: segments.len(),
        });
    }
    Ok(segments[..level.get()].join(IDENTIFIER_SEPARATOR))
}

/// Resolves identifiers, stripping a leading header segment (such as an
/// accession date prefix) when one is configured.
#[derive(Debug, Clone)]
pub struct ObjectIdentifierResolver {
    level: ObjectLevel,
    header: Option<Regex>,
}

impl ObjectIdentifierResolver {
    pub fn new(level: ObjectLevel) -> Self {
        Self {
            level,
            header: None,
        }
    }

    /// A first segment matching `header` is dropped before resolution.
    pub fn with_header_pattern(mut self, header: Regex) -> Self {
        self.header = Some(header);
        self
    }

    pub fn level(&self) -> ObjectLevel {
        self.level
    }

    /// Canonical path with any header segment removed.
    pub fn strip_header<'a>(&self, canonical_path: &'a str) -> &'a str {
        let Some(header) = &self.header else {
            return canonical_path;
        };
        match canonical_path.split_once('/') {
            Some((first, rest)) if header.is_match(first) => rest,
            _ => canonical_path,
        }
    }

    pub fn resolve(&self, canonical_path: &str) -> Result<Identifier, AssemblyError> {
        let stripped = self.strip_header(canonical_path);
        resolve_identifier(stripped, self.level).map_err(|e| match e {
            // Report the path the caller knows, not the stripped one
            AssemblyError::MalformedPath {
                level, segments, ..
            } => AssemblyError::MalformedPath {
                path: canonical_path.to_string(),
                level,
                segments,
            },
            other => other,
        })
    }
}
