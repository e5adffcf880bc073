//! Fixity Log
//!
//! Append-only, line-oriented store of fixity records. One record per line:
//!
//! ```text
//! <key>\t<digest>[\t<algorithm>[\t<size>[\t<mime>]]]
//! ```
//!
//! Loading replays every line in file order, so the last occurrence of a key
//! wins, exactly like an in-memory overwrite. Complete lines already on disk
//! are never rewritten.
//!
//! A final line without its newline is kept when it decodes to a record with
//! a full-length digest. Anything else in that position is an interrupted
//! append: load skips it and the writer cuts it off before appending.

use super::record::{FixityRecord, HashAlgorithm};
use crate::error::StorageError;
use crate::types::FileKey;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const FIELD_DELIMITER: char = '\t';
const MAX_FIELDS: usize = 5;

/// In-memory fixity log: key -> record, last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixityLog {
    records: BTreeMap<FileKey, FixityRecord>,
}

impl FixityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a log from disk. A missing file is an empty log.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let mut content = String::new();
        match File::open(path) {
            Ok(mut file) => {
                file.read_to_string(&mut content)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(StorageError::IoError(e)),
        }
        Self::parse(path, &content)
    }

    /// Parse log content; `path` is only used for error reporting.
    pub fn parse(path: &Path, content: &str) -> Result<Self, StorageError> {
        let (complete, tail) = match content.rfind('\n') {
            Some(pos) => content.split_at(pos + 1),
            None => ("", content),
        };
        let mut log = Self::new();
        for (index, raw) in complete.split('\n').enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.trim().is_empty() {
                continue;
            }
            let record = decode_line(line).ok_or_else(|| StorageError::MalformedLogLine {
                path: path.to_path_buf(),
                line_number: index + 1,
                line: line.to_string(),
            })?;
            log.insert(record);
        }
        if let Some(record) = decode_tail(tail) {
            log.insert(record);
        }
        Ok(log)
    }

    /// Insert or overwrite; returns the previous record for the key.
    pub fn insert(&mut self, record: FixityRecord) -> Option<FixityRecord> {
        self.records.insert(record.key.clone(), record)
    }

    /// Digest recorded for `key`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(|r| r.digest.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&FixityRecord> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Whether an identical key+digest pair is already recorded.
    pub fn contains_fixity(&self, record: &FixityRecord) -> bool {
        self.records
            .get(&record.key)
            .map(|existing| existing.same_fixity(record))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &FileKey> {
        self.records.keys()
    }

    pub fn records(&self) -> impl Iterator<Item = &FixityRecord> {
        self.records.values()
    }

    /// Append `records` to the log at `path`, skipping any whose key+digest
    /// pair is already present in `existing`. Returns the number of lines written.
    pub fn write<'a>(
        path: &Path,
        records: impl IntoIterator<Item = &'a FixityRecord>,
        existing: Option<&FixityLog>,
    ) -> Result<usize, StorageError> {
        let mut writer = FixityLogWriter::open(path)?;
        for record in records {
            if existing.map(|log| log.contains_fixity(record)).unwrap_or(false) {
                continue;
            }
            writer.append(record)?;
        }
        Ok(writer.appended())
    }

    /// Append this log's records to `path`, skipping those already in `existing`.
    pub fn append_to(&self, path: &Path, existing: Option<&FixityLog>) -> Result<usize, StorageError> {
        Self::write(path, self.records(), existing)
    }
}

impl FromIterator<FixityRecord> for FixityLog {
    fn from_iter<I: IntoIterator<Item = FixityRecord>>(iter: I) -> Self {
        let mut log = FixityLog::new();
        log.extend(iter);
        log
    }
}

impl Extend<FixityRecord> for FixityLog {
    fn extend<I: IntoIterator<Item = FixityRecord>>(&mut self, iter: I) {
        for record in iter {
            self.insert(record);
        }
    }
}

/// Single-writer append handle. Each record is written as one complete line
/// and flushed before the next one is accepted.
pub struct FixityLogWriter {
    file: File,
    path: PathBuf,
    appended: usize,
}

impl FixityLogWriter {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                repair_tail(&mut file, path)?;
            }
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            appended: 0,
        })
    }

    pub fn append(&mut self, record: &FixityRecord) -> Result<(), StorageError> {
        let line = encode_line(record)?;
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.appended += 1;
        Ok(())
    }

    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Terminate a well-formed final line, or cut off a fragment that can't be
/// a record.
fn repair_tail(file: &mut File, path: &Path) -> Result<(), StorageError> {
    let mut content = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut content)?;
    let keep = content
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let tail = std::str::from_utf8(&content[keep..]).unwrap_or("");

    if tail.trim().is_empty() || decode_tail(tail).is_some() {
        file.write_all(b"\n")?;
    } else {
        warn!(
            path = %path.display(),
            fragment = %String::from_utf8_lossy(&content[keep..]),
            "Dropping incomplete fixity record"
        );
        file.set_len(keep as u64)?;
    }
    file.sync_data()?;
    Ok(())
}

/// Record held by an unterminated final line, if it is complete.
fn decode_tail(tail: &str) -> Option<FixityRecord> {
    let line = tail.strip_suffix('\r').unwrap_or(tail);
    if line.trim().is_empty() {
        return None;
    }
    decode_line(line).filter(|record| record.digest.len() == record.algorithm.hex_len())
}

/// Encode one record as a newline-terminated log line.
pub fn encode_line(record: &FixityRecord) -> Result<String, StorageError> {
    if record.key.is_empty() || record.key.contains(['\t', '\n', '\r']) {
        return Err(StorageError::UnencodableKey {
            key: record.key.clone(),
        });
    }
    let mut line = format!(
        "{}{}{}{}{}",
        record.key, FIELD_DELIMITER, record.digest, FIELD_DELIMITER, record.algorithm
    );
    let mime = record
        .mime
        .as_deref()
        .filter(|m| !m.contains(['\t', '\n', '\r']));
    if record.size.is_some() || mime.is_some() {
        line.push(FIELD_DELIMITER);
        if let Some(size) = record.size {
            line.push_str(&size.to_string());
        }
    }
    if let Some(mime) = mime {
        line.push(FIELD_DELIMITER);
        line.push_str(mime);
    }
    line.push('\n');
    Ok(line)
}

/// Decode one non-empty log line; `None` when malformed.
pub fn decode_line(line: &str) -> Option<FixityRecord> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() < 2 || fields.len() > MAX_FIELDS {
        return None;
    }
    let key = fields[0];
    let digest = fields[1].trim();
    if key.is_empty() || digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let algorithm = match fields.get(2).map(|f| f.trim()) {
        Some(tag) if !tag.is_empty() => tag.parse::<HashAlgorithm>().ok()?,
        _ => HashAlgorithm::Sha256,
    };
    let mut record = FixityRecord::new(key, digest, algorithm);

    if let Some(size) = fields.get(3).map(|f| f.trim()).filter(|f| !f.is_empty()) {
        record.size = Some(size.parse().ok()?);
    }
    if let Some(mime) = fields.get(4).map(|f| f.trim()).filter(|f| !f.is_empty()) {
        record.mime = Some(mime.to_string());
    }
    Some(record)
}
