//! Object assembly
//!
//! Groups a flat batch by derived identifier, classifies each member against
//! the declared roles and validates every object independently. Problems are
//! accumulated on the report of the object they belong to.

use super::identifier::ObjectIdentifierResolver;
use super::metadata::{self, MetadataExtension, FITS_SIDECAR_SUFFIX};
use super::object::LogicalObject;
use super::roles::{validate_roles, Designation, RoleRule};
use super::sequence::{PageGap, SequenceCheck, SequenceValidator};
use crate::batch::{Batch, FileDescriptor};
use crate::error::{ApiError, AssemblyError, StorageError};
use crate::types::{FileKey, Identifier, RoleTag};
use serde::Serialize;
use std::collections::BTreeMap;

/// Validation outcome for one logical object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectReport {
    pub object: LogicalObject,
    pub descriptive_metadata: Option<FileKey>,
    pub representation: Option<FileKey>,
    pub missing_roles: Vec<RoleTag>,
    pub ambiguous_roles: Vec<RoleTag>,
    pub sequences: Vec<SequenceCheck>,
    pub errors: Vec<AssemblyError>,
    /// Members that matched no role
    pub unclassified: Vec<FileKey>,
    /// Technical metadata sidecars found among the members
    pub sidecars: Vec<FileKey>,
    pub extensions: BTreeMap<RoleTag, Vec<MetadataExtension>>,
    pub warnings: Vec<String>,
}

impl ObjectReport {
    pub fn identifier(&self) -> &str {
        &self.object.identifier
    }

    /// All required roles present and unambiguous, every sequence contiguous.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.sequences.iter().all(SequenceCheck::is_complete)
    }

    pub fn sequence_gaps(&self) -> impl Iterator<Item = (&str, &[PageGap])> {
        self.sequences
            .iter()
            .filter_map(|c| c.gap_report())
            .filter(|r| !r.is_complete())
            .map(|r| (r.role.as_str(), r.missing.as_slice()))
    }
}

/// Reports for every object in a batch plus the files no identifier could
/// be derived for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// Ordered by identifier
    pub objects: Vec<ObjectReport>,
    pub unresolved: Vec<AssemblyError>,
}

impl AssemblyReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.objects.iter().all(ObjectReport::is_complete)
    }

    pub fn complete_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_complete()).count()
    }

    pub fn object(&self, identifier: &str) -> Option<&ObjectReport> {
        self.objects
            .binary_search_by(|o| o.identifier().cmp(identifier))
            .ok()
            .map(|i| &self.objects[i])
    }

    /// Every accumulated error, unresolved files first.
    pub fn errors(&self) -> impl Iterator<Item = &AssemblyError> {
        self.unresolved
            .iter()
            .chain(self.objects.iter().flat_map(|o| o.errors.iter()))
    }
}

#[derive(Debug, Clone)]
pub struct ObjectAssembler {
    resolver: ObjectIdentifierResolver,
    roles: Vec<RoleRule>,
    sequence: SequenceValidator,
    extract_metadata: bool,
}

impl ObjectAssembler {
    pub fn new(resolver: ObjectIdentifierResolver, roles: Vec<RoleRule>) -> Result<Self, ApiError> {
        validate_roles(&roles)?;
        Ok(Self {
            resolver,
            roles,
            sequence: SequenceValidator::default(),
            extract_metadata: false,
        })
    }

    pub fn with_sequence_validator(mut self, sequence: SequenceValidator) -> Self {
        self.sequence = sequence;
        self
    }

    /// Read descriptive and technical metadata from disk while assembling.
    pub fn with_metadata_extraction(mut self, enabled: bool) -> Self {
        self.extract_metadata = enabled;
        self
    }

    pub fn roles(&self) -> &[RoleRule] {
        &self.roles
    }

    pub fn resolver(&self) -> &ObjectIdentifierResolver {
        &self.resolver
    }

    pub fn assemble_batch<B: Batch + ?Sized>(&self, batch: &B) -> Result<AssemblyReport, StorageError> {
        Ok(self.assemble(&batch.descriptors()?))
    }

    pub fn assemble(&self, descriptors: &[FileDescriptor]) -> AssemblyReport {
        let mut unresolved = Vec::new();
        let mut grouped: BTreeMap<Identifier, LogicalObject> = BTreeMap::new();

        for descriptor in descriptors {
            match self.resolver.resolve(&descriptor.canonical_path) {
                Ok(identifier) => {
                    grouped
                        .entry(identifier.clone())
                        .or_insert_with(|| LogicalObject::new(identifier))
                        .members
                        .insert(descriptor.clone());
                }
                Err(e) => unresolved.push(e),
            }
        }

        let objects = grouped
            .into_values()
            .map(|object| self.validate_object(object))
            .collect();

        AssemblyReport {
            objects,
            unresolved,
        }
    }

    fn validate_object(&self, mut object: LogicalObject) -> ObjectReport {
        let mut report = ObjectReport::default();

        for member in &object.members {
            if member.canonical_path.ends_with(FITS_SIDECAR_SUFFIX) {
                report.sidecars.push(member.canonical_path.clone());
                continue;
            }
            let matched: Vec<&RoleRule> = self
                .roles
                .iter()
                .filter(|r| r.matches(&member.canonical_path))
                .collect();
            if matched.is_empty() {
                report.unclassified.push(member.canonical_path.clone());
            }
            for rule in matched {
                object
                    .roles
                    .entry(rule.tag.clone())
                    .or_default()
                    .push(member.clone());
            }
        }

        for rule in &self.roles {
            let members = object.members_for(&rule.tag);

            if rule.is_sequence() {
                if members.is_empty() && !rule.required {
                    continue;
                }
                match self.sequence.validate(&rule.tag, members) {
                    Ok(check) => report.sequences.push(check),
                    Err(errors) => report.errors.extend(errors),
                }
            } else if members.len() > 1 {
                report.ambiguous_roles.push(rule.tag.clone());
                report.errors.push(AssemblyError::AmbiguousRole {
                    identifier: object.identifier.clone(),
                    role: rule.tag.clone(),
                    matches: members.iter().map(|m| m.canonical_path.clone()).collect(),
                });
            } else if let Some(member) = members.first() {
                match rule.designation {
                    Designation::DescriptiveMetadata => {
                        report.descriptive_metadata = Some(member.canonical_path.clone())
                    }
                    Designation::Representation => {
                        report.representation = Some(member.canonical_path.clone())
                    }
                    Designation::None => {}
                }
            }

            if members.is_empty() && rule.required {
                report.missing_roles.push(rule.tag.clone());
                report.errors.push(AssemblyError::MissingRole {
                    identifier: object.identifier.clone(),
                    role: rule.tag.clone(),
                });
            }
        }

        if self.extract_metadata {
            self.extract_extensions(&object, &mut report);
        }

        report.object = object;
        report
    }

    fn extract_extensions(&self, object: &LogicalObject, report: &mut ObjectReport) {
        for rule in &self.roles {
            let members = object.members_for(&rule.tag);
            let mut values = Vec::new();

            if rule.designation == Designation::DescriptiveMetadata {
                // Only an unambiguous record is read
                if let [member] = members {
                    match metadata::read_descriptive(member) {
                        Ok(dc) => values.push(MetadataExtension::Descriptive(dc)),
                        Err(warning) => report.warnings.push(warning),
                    }
                }
            }

            if rule.is_sequence() {
                for member in members.iter().filter(|m| m.mime_type == "image/tiff") {
                    match metadata::read_image_technical(member) {
                        Ok(tech) => values.push(MetadataExtension::ImageTechnical(tech)),
                        Err(warning) => report.warnings.push(warning),
                    }
                }
            }

            if !values.is_empty() {
                report.extensions.insert(rule.tag.clone(), values);
            }
        }
    }
}
