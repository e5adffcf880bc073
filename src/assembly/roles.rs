//! Role rules
//!
//! A role rule classifies object members by testing their canonical path
//! against a substring or a regular expression.

use crate::error::ApiError;
use crate::types::RoleTag;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How many members a role expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Exactly one member
    #[default]
    Single,
    /// One or more members forming a numbered page sequence
    Sequence,
}

/// Representative file a role supplies for its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Designation {
    #[default]
    None,
    DescriptiveMetadata,
    Representation,
}

#[derive(Debug, Clone)]
pub enum RoleMatcher {
    Substring(String),
    Pattern(Regex),
}

impl RoleMatcher {
    pub fn is_match(&self, canonical_path: &str) -> bool {
        match self {
            RoleMatcher::Substring(needle) => canonical_path.contains(needle.as_str()),
            RoleMatcher::Pattern(pattern) => pattern.is_match(canonical_path),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleMatcher::Substring(needle) => needle,
            RoleMatcher::Pattern(pattern) => pattern.as_str(),
        }
    }
}

/// One declared role.
#[derive(Debug, Clone)]
pub struct RoleRule {
    pub tag: RoleTag,
    pub matcher: RoleMatcher,
    pub kind: RoleKind,
    pub designation: Designation,
    /// An object lacking a required role is incomplete
    pub required: bool,
}

impl RoleRule {
    pub fn substring(tag: impl Into<RoleTag>, needle: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            matcher: RoleMatcher::Substring(needle.into()),
            kind: RoleKind::Single,
            designation: Designation::None,
            required: true,
        }
    }

    pub fn regex(tag: impl Into<RoleTag>, pattern: &str) -> Result<Self, ApiError> {
        let compiled = Regex::new(pattern).map_err(|source| ApiError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::compiled(tag, compiled))
    }

    pub fn compiled(tag: impl Into<RoleTag>, pattern: Regex) -> Self {
        Self {
            tag: tag.into(),
            matcher: RoleMatcher::Pattern(pattern),
            kind: RoleKind::Single,
            designation: Designation::None,
            required: true,
        }
    }

    /// Mark the role as sequence-bearing.
    pub fn sequence(mut self) -> Self {
        self.kind = RoleKind::Sequence;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn designated(mut self, designation: Designation) -> Self {
        self.designation = designation;
        self
    }

    pub fn matches(&self, canonical_path: &str) -> bool {
        self.matcher.is_match(canonical_path)
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == RoleKind::Sequence
    }
}

/// Per-page OCR text: four digits right before `.txt`.
pub const OCR_TEXT_PATTERN: &str = r"\d{4}\.txt$";

/// Role set applied when configuration declares none.
pub fn default_roles() -> Vec<RoleRule> {
    let ocr = Regex::new(OCR_TEXT_PATTERN)
        .unwrap_or_else(|_| unreachable!("OCR text pattern compiles"));
    vec![
        RoleRule::substring("dc.xml", "dc.xml").designated(Designation::DescriptiveMetadata),
        RoleRule::substring("pdf", "pdf").designated(Designation::Representation),
        RoleRule::substring("mets.xml", "mets.xml"),
        RoleRule::substring("ALTO", "ALTO").sequence(),
        RoleRule::substring("TIFF", "TIFF").sequence(),
        RoleRule::substring("JPEG", "JPEG").sequence(),
        RoleRule::compiled("OCR", ocr).sequence().optional(),
    ]
}

/// Reject duplicate tags and more than one role per designation.
pub fn validate_roles(roles: &[RoleRule]) -> Result<(), ApiError> {
    let mut seen = std::collections::HashSet::new();
    for role in roles {
        if role.tag.trim().is_empty() {
            return Err(ApiError::ConfigError("Role tag cannot be empty".to_string()));
        }
        if !seen.insert(role.tag.as_str()) {
            return Err(ApiError::ConfigError(format!(
                "Role tag '{}' is declared more than once",
                role.tag
            )));
        }
    }
    for designation in [Designation::DescriptiveMetadata, Designation::Representation] {
        let designated: Vec<&str> = roles
            .iter()
            .filter(|r| r.designation == designation)
            .map(|r| r.tag.as_str())
            .collect();
        if designated.len() > 1 {
            return Err(ApiError::ConfigError(format!(
                "Only one role may be designated {:?}, found: {}",
                designation,
                designated.join(", ")
            )));
        }
        if let Some(tag) = designated.first() {
            if roles.iter().any(|r| r.tag == *tag && r.is_sequence()) {
                return Err(ApiError::ConfigError(format!(
                    "Role '{}' is a sequence and cannot be designated {:?}",
                    tag, designation
                )));
            }
        }
    }
    Ok(())
}
