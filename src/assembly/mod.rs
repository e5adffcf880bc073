//! Digital object assembly
//!
//! Turns a flat batch of preservation files into logical objects: derive each
//! file's identifier, group by identifier, classify members by role and check
//! that required roles and page sequences are complete.

pub mod assembler;
pub mod identifier;
pub mod metadata;
pub mod object;
pub mod roles;
pub mod sequence;

pub use assembler::{AssemblyReport, ObjectAssembler, ObjectReport};
pub use identifier::{resolve_identifier, ObjectIdentifierResolver, ObjectLevel};
pub use metadata::{DescriptiveMetadata, ImageTechnicalMetadata, MetadataExtension};
pub use object::LogicalObject;
pub use roles::{default_roles, Designation, RoleKind, RoleMatcher, RoleRule};
pub use sequence::{find_gaps, PageGap, SequenceCheck, SequenceGapReport, SequenceValidator};
