//! Fixity hashing
//!
//! Produces a fixity log for a batch. Keys already present in a prior log are
//! carried forward without re-reading the file unless a rehash is forced, so a
//! repeated run over a slowly growing directory only hashes new files.

use super::log::{FixityLog, FixityLogWriter};
use super::record::{FixityRecord, HashAlgorithm};
use crate::batch::FileDescriptor;
use crate::error::{HashError, StorageError};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;
use std::sync::mpsc;
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Pluggable content hash function.
pub trait ContentHasher: Send + Sync {
    fn hash_file(&self, path: &Path, algorithm: HashAlgorithm) -> std::io::Result<String>;
}

/// Streams file content through SHA-256 or BLAKE3.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingHasher;

impl ContentHasher for StreamingHasher {
    fn hash_file(&self, path: &Path, algorithm: HashAlgorithm) -> std::io::Result<String> {
        let file = std::fs::File::open(path)?;
        hash_reader(file, algorithm)
    }
}

/// Hash everything `reader` yields; lowercase hex.
pub fn hash_reader<R: Read>(mut reader: R, algorithm: HashAlgorithm) -> std::io::Result<String> {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = reader.read(&mut buffer)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
            Ok(hex::encode(hasher.finalize()))
        }
        HashAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            loop {
                let n = reader.read(&mut buffer)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buffer[..n]);
            }
            Ok(hex::encode(hasher.finalize().as_bytes()))
        }
    }
}

/// Result of one hashing pass.
#[derive(Debug, Default)]
pub struct HashOutcome {
    pub log: FixityLog,
    /// Per-file failures, sorted by key
    pub errors: Vec<HashError>,
    /// Files whose digest was computed on this pass
    pub hashed: usize,
    /// Files whose record was copied from the prior log
    pub carried_forward: usize,
    /// Lines appended to the on-disk log (0 for in-memory passes)
    pub appended: usize,
}

/// Builds fixity logs from batches.
pub struct FixityHasher<H: ContentHasher = StreamingHasher> {
    hasher: H,
    algorithm: HashAlgorithm,
    force_rehash: bool,
    workers: usize,
}

impl FixityHasher<StreamingHasher> {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self::with_hasher(StreamingHasher, algorithm)
    }
}

impl<H: ContentHasher> FixityHasher<H> {
    pub fn with_hasher(hasher: H, algorithm: HashAlgorithm) -> Self {
        Self {
            hasher,
            algorithm,
            force_rehash: false,
            workers: 1,
        }
    }

    /// Ignore the prior log and recompute every digest.
    pub fn force_rehash(mut self, force: bool) -> Self {
        self.force_rehash = force;
        self
    }

    /// Number of hashing threads (at least 1).
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash a batch in memory.
    pub fn hash_batch(
        &self,
        descriptors: &[FileDescriptor],
        prior: Option<&FixityLog>,
    ) -> HashOutcome {
        // The sink never fails, so neither does the pass
        self.run(descriptors, prior, |_| Ok(()))
            .unwrap_or_default()
    }

    /// Hash a batch, appending each fresh record to the log at `log_path` as
    /// soon as it is computed. Records identical to the prior log are not
    /// re-appended. Records flushed before an interruption stay valid.
    pub fn hash_to_log(
        &self,
        descriptors: &[FileDescriptor],
        prior: Option<&FixityLog>,
        log_path: &Path,
    ) -> Result<HashOutcome, StorageError> {
        let mut writer = FixityLogWriter::open(log_path)?;
        let mut outcome = self.run(descriptors, prior, |record| {
            if prior.map(|p| p.contains_fixity(record)).unwrap_or(false) {
                return Ok(());
            }
            writer.append(record)
        })?;
        outcome.appended = writer.appended();
        info!(
            log = %log_path.display(),
            appended = outcome.appended,
            "Fixity log updated"
        );
        Ok(outcome)
    }

    fn run<F>(
        &self,
        descriptors: &[FileDescriptor],
        prior: Option<&FixityLog>,
        mut sink: F,
    ) -> Result<HashOutcome, StorageError>
    where
        F: FnMut(&FixityRecord) -> Result<(), StorageError>,
    {
        let mut outcome = HashOutcome::default();
        let mut pending: Vec<&FileDescriptor> = Vec::new();

        for descriptor in descriptors {
            let key = &descriptor.canonical_path;
            if !descriptor.file_path.exists() {
                warn!(key = %key, path = %descriptor.file_path.display(), "File not found");
                outcome.errors.push(HashError::FileNotFound {
                    key: key.clone(),
                    path: descriptor.file_path.clone(),
                });
                continue;
            }
            if !self.force_rehash {
                // A digest from another algorithm can't be compared later
                if let Some(existing) = prior
                    .and_then(|p| p.get(key))
                    .filter(|existing| existing.algorithm == self.algorithm)
                {
                    debug!(key = %key, "Carrying forward existing digest");
                    sink(existing)?;
                    outcome.log.insert(existing.clone());
                    outcome.carried_forward += 1;
                    continue;
                }
            }
            pending.push(descriptor);
        }

        if self.workers <= 1 || pending.len() <= 1 {
            for descriptor in pending {
                let result = self.hasher.hash_file(&descriptor.file_path, self.algorithm);
                self.collect(descriptor, result, &mut outcome, &mut sink)?;
            }
        } else {
            self.run_parallel(pending, &mut outcome, &mut sink)?;
        }

        outcome.errors.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(outcome)
    }

    /// Workers pull from a shared queue and send digests to this thread, the
    /// only one that touches the outcome and the sink.
    fn run_parallel<F>(
        &self,
        pending: Vec<&FileDescriptor>,
        outcome: &mut HashOutcome,
        sink: &mut F,
    ) -> Result<(), StorageError>
    where
        F: FnMut(&FixityRecord) -> Result<(), StorageError>,
    {
        let worker_count = self.workers.min(pending.len());
        let queue = Mutex::new(pending.into_iter().collect::<VecDeque<_>>());
        let (tx, rx) = mpsc::channel();

        std::thread::scope(|scope| {
            for _ in 0..worker_count {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || loop {
                    let next = queue.lock().pop_front();
                    let Some(descriptor) = next else { break };
                    let result = self.hasher.hash_file(&descriptor.file_path, self.algorithm);
                    if tx.send((descriptor, result)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            // Leaving early drops the receiver, which stops the workers
            for (descriptor, result) in rx {
                self.collect(descriptor, result, outcome, sink)?;
            }
            Ok(())
        })
    }

    fn collect<F>(
        &self,
        descriptor: &FileDescriptor,
        result: std::io::Result<String>,
        outcome: &mut HashOutcome,
        sink: &mut F,
    ) -> Result<(), StorageError>
    where
        F: FnMut(&FixityRecord) -> Result<(), StorageError>,
    {
        let key = &descriptor.canonical_path;
        match result {
            Ok(digest) => {
                let record = FixityRecord::for_descriptor(descriptor, digest, self.algorithm);
                debug!(key = %key, digest = %record.digest, "Hashed");
                sink(&record)?;
                outcome.log.insert(record);
                outcome.hashed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(key = %key, "File disappeared before it could be hashed");
                outcome.errors.push(HashError::FileNotFound {
                    key: key.clone(),
                    path: descriptor.file_path.clone(),
                });
            }
            Err(e) => {
                warn!(key = %key, error = %e, "File could not be hashed");
                outcome.errors.push(HashError::Unreadable {
                    key: key.clone(),
                    path: descriptor.file_path.clone(),
                    source: e,
                });
            }
        }
        Ok(())
    }
}
