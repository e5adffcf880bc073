//! `[assembly]` section: object level, header and page patterns, role list.

use crate::assembly::roles::{validate_roles, Designation, RoleKind, RoleRule};
use crate::assembly::sequence::DEFAULT_PAGE_PATTERN;
use crate::assembly::{ObjectAssembler, ObjectIdentifierResolver, ObjectLevel, SequenceValidator};
use crate::error::ApiError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default header: an accession prefix such as `2015-123`.
pub const DEFAULT_HEADER_PATTERN: &str = r"^\d{4}-\d{3}$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    #[default]
    Substring,
    Regex,
}

/// One role as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub tag: String,
    pub pattern: String,
    #[serde(default)]
    pub matcher: MatcherKind,
    #[serde(default)]
    pub kind: RoleKind,
    #[serde(default)]
    pub designation: Designation,
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

impl RoleConfig {
    pub fn to_rule(&self) -> Result<RoleRule, ApiError> {
        let rule = match self.matcher {
            MatcherKind::Substring => RoleRule::substring(self.tag.clone(), self.pattern.clone()),
            MatcherKind::Regex => RoleRule::regex(self.tag.clone(), &self.pattern)?,
        };
        let rule = match self.kind {
            RoleKind::Sequence => rule.sequence(),
            RoleKind::Single => rule,
        };
        let rule = rule.designated(self.designation);
        Ok(if self.required { rule } else { rule.optional() })
    }
}

impl From<&RoleRule> for RoleConfig {
    fn from(rule: &RoleRule) -> Self {
        use crate::assembly::RoleMatcher;
        Self {
            tag: rule.tag.clone(),
            pattern: rule.matcher.as_str().to_string(),
            matcher: match rule.matcher {
                RoleMatcher::Substring(_) => MatcherKind::Substring,
                RoleMatcher::Pattern(_) => MatcherKind::Regex,
            },
            kind: rule.kind,
            designation: rule.designation,
            required: rule.required,
        }
    }
}

fn default_object_level() -> ObjectLevel {
    ObjectLevel::ONE
}

fn default_header_pattern() -> Option<String> {
    Some(DEFAULT_HEADER_PATTERN.to_string())
}

fn default_page_pattern() -> String {
    DEFAULT_PAGE_PATTERN.to_string()
}

fn default_role_configs() -> Vec<RoleConfig> {
    crate::assembly::default_roles()
        .iter()
        .map(RoleConfig::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    #[serde(default = "default_object_level")]
    pub object_level: ObjectLevel,

    /// Leading segment stripped before identifier derivation; `None` disables
    #[serde(default = "default_header_pattern")]
    pub header_pattern: Option<String>,

    /// Regex whose first capture group is the page index
    #[serde(default = "default_page_pattern")]
    pub page_pattern: String,

    #[serde(default = "default_role_configs")]
    pub roles: Vec<RoleConfig>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            object_level: default_object_level(),
            header_pattern: default_header_pattern(),
            page_pattern: default_page_pattern(),
            roles: default_role_configs(),
        }
    }
}

impl AssemblyConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        self.build_assembler(None).map(|_| ())
    }

    pub fn role_rules(&self) -> Result<Vec<RoleRule>, ApiError> {
        let rules = self
            .roles
            .iter()
            .map(RoleConfig::to_rule)
            .collect::<Result<Vec<_>, _>>()?;
        validate_roles(&rules)?;
        Ok(rules)
    }

    pub fn resolver(&self, level: Option<ObjectLevel>) -> Result<ObjectIdentifierResolver, ApiError> {
        let resolver = ObjectIdentifierResolver::new(level.unwrap_or(self.object_level));
        match self.header_pattern.as_deref().filter(|p| !p.is_empty()) {
            Some(pattern) => {
                let header = Regex::new(pattern).map_err(|source| ApiError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                Ok(resolver.with_header_pattern(header))
            }
            None => Ok(resolver),
        }
    }

    /// Assembler built from this section. `level` overrides `object_level`.
    pub fn build_assembler(&self, level: Option<ObjectLevel>) -> Result<ObjectAssembler, ApiError> {
        let sequence = SequenceValidator::new(&self.page_pattern)?;
        Ok(ObjectAssembler::new(self.resolver(level)?, self.role_rules()?)?
            .with_sequence_validator(sequence))
    }
}
