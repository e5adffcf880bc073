//! Fixity
//!
//! Records content digests of files at two points in their lifecycle (on the
//! origin media and after staging) and reconciles the two record sets to detect
//! corruption, omission and contamination.

pub mod hasher;
pub mod log;
pub mod reconcile;
pub mod record;

pub use hasher::{hash_reader, ContentHasher, FixityHasher, HashOutcome, StreamingHasher};
pub use log::{FixityLog, FixityLogWriter};
pub use reconcile::{
    reconcile, Classification, ReconciliationEntry, ReconciliationReport, ReconciliationResult,
    ReconciliationSummary, Reconciler,
};
pub use record::{FixityRecord, HashAlgorithm};
