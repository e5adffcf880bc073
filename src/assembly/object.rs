use crate::batch::FileDescriptor;
use crate::types::{Identifier, RoleTag};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Files sharing one identifier, with their role classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogicalObject {
    pub identifier: Identifier,
    pub members: BTreeSet<FileDescriptor>,
    /// Role tag to the members it matched, ordered by canonical path
    pub roles: BTreeMap<RoleTag, Vec<FileDescriptor>>,
}

impl LogicalObject {
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn members_for(&self, role: &str) -> &[FileDescriptor] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Total size of all members in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.members.iter().map(|m| m.size_bytes).sum()
    }
}
