//! Core types shared across the fixity and assembly pipelines.

/// FileKey: canonical, root-relative path of a file; unique within a fixity log
pub type FileKey = String;

/// Identifier: logical digital-object identifier derived from a canonical path
pub type Identifier = String;

/// RoleTag: name of a file's function within a digital object
pub type RoleTag = String;

/// Separator joining leading path segments into an object identifier
pub const IDENTIFIER_SEPARATOR: &str = "-";
