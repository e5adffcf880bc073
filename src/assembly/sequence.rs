//! Page sequence validation
//!
//! Sequence-bearing roles carry a page index in each member's file name. A
//! complete sequence covers every index from 1 to the highest one present.

use crate::batch::FileDescriptor;
use crate::error::{ApiError, AssemblyError};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default page pattern: the run of digits before the first extension dot of
/// the final path segment.
pub const DEFAULT_PAGE_PATTERN: &str = r"(\d+)\.[^/]*$";

/// A run of consecutive absent page indices, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PageGap {
    pub first: u64,
    pub last: u64,
}

impl PageGap {
    pub fn single(index: u64) -> Self {
        Self {
            first: index,
            last: index,
        }
    }

    /// Number of absent pages in the run.
    pub fn pages(&self) -> u64 {
        self.last - self.first + 1
    }

    pub fn contains(&self, index: u64) -> bool {
        (self.first..=self.last).contains(&index)
    }
}

impl fmt::Display for PageGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

/// Gaps found in one role's sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceGapReport {
    pub role: String,
    pub expected_max: u64,
    /// Absent runs in ascending order; one entry per run, not per page
    pub missing: Vec<PageGap>,
}

impl SequenceGapReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Total number of absent pages.
    pub fn missing_pages(&self) -> u64 {
        self.missing.iter().map(PageGap::pages).sum()
    }

    /// Absent indices one by one, in ascending order. Lazy.
    pub fn missing_indices(&self) -> impl Iterator<Item = u64> + '_ {
        self.missing.iter().flat_map(|gap| gap.first..=gap.last)
    }
}

/// Outcome of validating one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SequenceCheck {
    /// The role matched no members
    NoSequence { role: String },
    Checked(SequenceGapReport),
}

impl SequenceCheck {
    pub fn role(&self) -> &str {
        match self {
            SequenceCheck::NoSequence { role } => role,
            SequenceCheck::Checked(report) => &report.role,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            SequenceCheck::NoSequence { .. } => false,
            SequenceCheck::Checked(report) => report.is_complete(),
        }
    }

    pub fn gap_report(&self) -> Option<&SequenceGapReport> {
        match self {
            SequenceCheck::Checked(report) => Some(report),
            SequenceCheck::NoSequence { .. } => None,
        }
    }
}

/// Runs of `1..=max(indices)` absent from `indices`. Work and output are
/// bounded by the number of indices, not by their magnitude.
pub fn find_gaps(indices: &BTreeSet<u64>) -> Vec<PageGap> {
    let mut gaps = Vec::new();
    let mut expected = 1u64;
    for &index in indices {
        if index > expected {
            gaps.push(PageGap {
                first: expected,
                last: index - 1,
            });
        }
        expected = index.saturating_add(1);
    }
    gaps
}

#[derive(Debug, Clone)]
pub struct SequenceValidator {
    page_pattern: Regex,
}

impl Default for SequenceValidator {
    fn default() -> Self {
        Self {
            page_pattern: Regex::new(DEFAULT_PAGE_PATTERN)
                .unwrap_or_else(|_| unreachable!("default page pattern compiles")),
        }
    }
}

impl SequenceValidator {
    /// `pattern` must contain at least one capture group; the first group is
    /// the page index.
    pub fn new(pattern: &str) -> Result<Self, ApiError> {
        let page_pattern = Regex::new(pattern).map_err(|source| ApiError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        if page_pattern.captures_len() < 2 {
            return Err(ApiError::ConfigError(format!(
                "Page pattern {:?} needs a capture group for the page index",
                pattern
            )));
        }
        Ok(Self { page_pattern })
    }

    pub fn pattern(&self) -> &str {
        self.page_pattern.as_str()
    }

    /// Extract the page index of `canonical_path`. Zero is not a valid index.
    pub fn extract_index(&self, role: &str, canonical_path: &str) -> Result<u64, AssemblyError> {
        let raw = self
            .page_pattern
            .captures(canonical_path)
            .and_then(|c| c.get(1))
            .ok_or_else(|| AssemblyError::MissingIndex {
                role: role.to_string(),
                path: canonical_path.to_string(),
            })?
            .as_str();

        let invalid = || AssemblyError::InvalidIndex {
            role: role.to_string(),
            path: canonical_path.to_string(),
            raw: raw.to_string(),
        };
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        match raw.parse::<u64>() {
            Ok(0) | Err(_) => Err(invalid()),
            Ok(index) => Ok(index),
        }
    }

    /// Validate the members of one role. Per-member problems are all
    /// collected; any of them means no gap report is produced.
    pub fn validate(
        &self,
        role: &str,
        members: &[FileDescriptor],
    ) -> Result<SequenceCheck, Vec<AssemblyError>> {
        if members.is_empty() {
            return Ok(SequenceCheck::NoSequence {
                role: role.to_string(),
            });
        }

        let mut errors = Vec::new();
        let mut claims: BTreeMap<u64, Vec<String>> = BTreeMap::new();
        for member in members {
            match self.extract_index(role, &member.canonical_path) {
                Ok(index) => claims
                    .entry(index)
                    .or_default()
                    .push(member.canonical_path.clone()),
                Err(e) => errors.push(e),
            }
        }

        for (index, paths) in &claims {
            if paths.len() > 1 {
                let mut paths = paths.clone();
                paths.sort();
                errors.push(AssemblyError::DuplicateIndex {
                    role: role.to_string(),
                    index: *index,
                    paths,
                });
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let indices: BTreeSet<u64> = claims.into_keys().collect();
        Ok(SequenceCheck::Checked(SequenceGapReport {
            role: role.to_string(),
            expected_max: indices.iter().next_back().copied().unwrap_or(0),
            missing: find_gaps(&indices),
        }))
    }
}
