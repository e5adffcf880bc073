//! Reconciliation of origin and staged fixity logs
//!
//! Every key present in either log lands in exactly one of four sets. The
//! result depends only on the contents of the two logs.

use super::log::FixityLog;
use super::record::FixityRecord;
use crate::types::FileKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Classification of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Present on both sides with equal digests
    Consistent,
    /// Present in origin, absent from staging (not copied)
    Missing,
    /// Present on both sides with different digests
    Corrupted,
    /// Present in staging, absent from origin (foreign file)
    Unexpected,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Consistent => "consistent",
            Classification::Missing => "missing",
            Classification::Corrupted => "corrupted",
            Classification::Unexpected => "unexpected",
        }
    }
}

/// Four disjoint key sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub consistent: BTreeSet<FileKey>,
    pub missing: BTreeSet<FileKey>,
    pub corrupted: BTreeSet<FileKey>,
    pub unexpected: BTreeSet<FileKey>,
}

impl ReconciliationResult {
    /// No missing, corrupted or unexpected keys.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.corrupted.is_empty() && self.unexpected.is_empty()
    }

    pub fn classification_of(&self, key: &str) -> Option<Classification> {
        if self.consistent.contains(key) {
            Some(Classification::Consistent)
        } else if self.missing.contains(key) {
            Some(Classification::Missing)
        } else if self.corrupted.contains(key) {
            Some(Classification::Corrupted)
        } else if self.unexpected.contains(key) {
            Some(Classification::Unexpected)
        } else {
            None
        }
    }

    pub fn total(&self) -> usize {
        self.consistent.len() + self.missing.len() + self.corrupted.len() + self.unexpected.len()
    }
}

/// One key with both digests, for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    pub key: FileKey,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged_digest: Option<String>,
}

/// Counts mirroring the audit summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub origin_files: usize,
    pub staged_files: usize,
    pub consistent: usize,
    pub missing: usize,
    pub corrupted: usize,
    pub unexpected: usize,
}

/// Classified sets plus per-key digests, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub summary: ReconciliationSummary,
    pub entries: Vec<ReconciliationEntry>,
    #[serde(skip)]
    pub result: ReconciliationResult,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.result.is_clean()
    }

    pub fn entries_in(&self, classification: Classification) -> impl Iterator<Item = &ReconciliationEntry> {
        self.entries
            .iter()
            .filter(move |e| e.classification == classification)
    }
}

/// Compares an origin log against a staged log.
pub struct Reconciler;

impl Reconciler {
    pub fn reconcile(origin: &FixityLog, staged: &FixityLog) -> ReconciliationResult {
        let mut result = ReconciliationResult::default();
        for key in origin.keys().chain(staged.keys()) {
            let classification = classify(origin, staged, key);
            let set = match classification {
                Classification::Consistent => &mut result.consistent,
                Classification::Missing => &mut result.missing,
                Classification::Corrupted => &mut result.corrupted,
                Classification::Unexpected => &mut result.unexpected,
            };
            set.insert(key.clone());
        }
        result
    }

    pub fn report(origin: &FixityLog, staged: &FixityLog) -> ReconciliationReport {
        let result = Self::reconcile(origin, staged);

        let keys: BTreeSet<&FileKey> = origin.keys().chain(staged.keys()).collect();
        let entries = keys
            .into_iter()
            .map(|key| ReconciliationEntry {
                key: key.clone(),
                classification: classify(origin, staged, key),
                origin_digest: origin.lookup(key).map(str::to_string),
                staged_digest: staged.lookup(key).map(str::to_string),
            })
            .collect();

        let summary = ReconciliationSummary {
            origin_files: origin.len(),
            staged_files: staged.len(),
            consistent: result.consistent.len(),
            missing: result.missing.len(),
            corrupted: result.corrupted.len(),
            unexpected: result.unexpected.len(),
        };

        ReconciliationReport {
            summary,
            entries,
            result,
        }
    }

    /// First key recorded on both sides under different algorithms. Digests
    /// of such a pair can't be compared.
    pub fn algorithm_mismatch<'a>(
        origin: &'a FixityLog,
        staged: &'a FixityLog,
    ) -> Option<(&'a FixityRecord, &'a FixityRecord)> {
        origin.records().find_map(|theirs| {
            staged
                .get(&theirs.key)
                .filter(|ours| ours.algorithm != theirs.algorithm)
                .map(|ours| (theirs, ours))
        })
    }
}

/// Convenience wrapper around [`Reconciler::reconcile`].
pub fn reconcile(origin: &FixityLog, staged: &FixityLog) -> ReconciliationResult {
    Reconciler::reconcile(origin, staged)
}

fn classify(origin: &FixityLog, staged: &FixityLog, key: &str) -> Classification {
    match (origin.lookup(key), staged.lookup(key)) {
        (_, None) => Classification::Missing,
        (None, Some(_)) => Classification::Unexpected,
        (Some(a), Some(b)) if a == b => Classification::Consistent,
        (Some(_), Some(_)) => Classification::Corrupted,
    }
}
