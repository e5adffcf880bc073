use std::fs;
use std::path::Path;

use reliquary::batch::{Batch, DirectoryBatch};
use reliquary::fixity::{
    Classification, FixityHasher, FixityLog, FixityLogWriter, HashAlgorithm, Reconciler,
};
use reliquary::staging::StagingArea;
use tempfile::TempDir;

const ORIGIN_LOG: &str = "fixityFromOrigin.txt";
const STAGED_LOG: &str = "fixityOnDisk.txt";

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Source tree with one accession holding three files.
fn source_tree(temp: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let source = temp.path().join("source");
    let item = source.join("2015-123");
    write_file(&item.join("mvol/0001/0002/0003/TIFF/page_0001.tif"), "page one");
    write_file(&item.join("mvol/0001/0002/0003/TIFF/page_0002.tif"), "page two");
    write_file(&item.join("mvol/0001/0002/0003/notes.txt"), "notes");
    (source, item)
}

fn hash_into(batch: &DirectoryBatch, log_path: &Path, rehash: bool) -> FixityLog {
    let prior = FixityLog::load(log_path).unwrap();
    let descriptors = batch.descriptors().unwrap();
    let hasher = FixityHasher::new(HashAlgorithm::Sha256).force_rehash(rehash);
    let outcome = hasher
        .hash_to_log(&descriptors, (!rehash).then_some(&prior), log_path)
        .unwrap();
    assert!(outcome.errors.is_empty());
    FixityLog::load(log_path).unwrap()
}

#[test]
fn staged_copy_reconciles_clean() {
    let temp = TempDir::new().unwrap();
    let (source, item) = source_tree(&temp);
    let area = StagingArea::create(temp.path().join("staging")).unwrap();
    let folder = area.allocate_folder("acc").unwrap();
    assert_eq!(folder.name, "acc1");

    let copied = folder.copy_in(&source, &item).unwrap();
    assert_eq!(copied.copied, 3);

    let origin = hash_into(
        &DirectoryBatch::new(&source, &item).unwrap(),
        &folder.admin_file(ORIGIN_LOG),
        false,
    );
    let staged = hash_into(
        &folder.data_batch().unwrap(),
        &folder.admin_file(STAGED_LOG),
        false,
    );

    assert_eq!(origin.len(), 3);
    assert!(origin.contains_key("2015-123/mvol/0001/0002/0003/TIFF/page_0001.tif"));
    let report = Reconciler::report(&origin, &staged);
    assert!(report.is_clean());
    assert_eq!(report.summary.consistent, 3);
    assert_eq!(report.summary.staged_files, 3);
}

#[test]
fn tampered_staging_area_is_classified() {
    let temp = TempDir::new().unwrap();
    let (source, item) = source_tree(&temp);
    let area = StagingArea::create(temp.path().join("staging")).unwrap();
    let folder = area.allocate_folder("acc").unwrap();
    folder.copy_in(&source, &item).unwrap();

    let origin_batch = DirectoryBatch::new(&source, &item).unwrap();
    let origin_log = folder.admin_file(ORIGIN_LOG);
    let staged_log = folder.admin_file(STAGED_LOG);
    let origin = hash_into(&origin_batch, &origin_log, false);
    hash_into(&folder.data_batch().unwrap(), &staged_log, false);

    let staged_root = folder.data_dir.join("2015-123/mvol/0001/0002/0003");
    fs::write(staged_root.join("TIFF/page_0001.tif"), "page 1!!").unwrap();
    fs::remove_file(staged_root.join("notes.txt")).unwrap();
    write_file(&staged_root.join("stray.tmp"), "not from the origin");

    // Without a rehash the recorded digest of the altered file is carried forward
    let carried = hash_into(&folder.data_batch().unwrap(), &staged_log, false);
    let report = Reconciler::report(&origin, &carried);
    assert_eq!(report.summary.corrupted, 0);
    assert_eq!(report.summary.unexpected, 1);
    // The deleted file is still in the append-only log
    assert_eq!(report.summary.missing, 0);

    let rehashed = hash_into(&folder.data_batch().unwrap(), &staged_log, true);
    let result = Reconciler::reconcile(&origin, &rehashed);
    assert_eq!(
        result.classification_of("2015-123/mvol/0001/0002/0003/TIFF/page_0001.tif"),
        Some(Classification::Corrupted)
    );
    assert_eq!(
        result.classification_of("2015-123/mvol/0001/0002/0003/stray.tmp"),
        Some(Classification::Unexpected)
    );
    assert_eq!(
        result.classification_of("2015-123/mvol/0001/0002/0003/TIFF/page_0002.tif"),
        Some(Classification::Consistent)
    );
    assert!(!result.is_clean());
}

#[test]
fn deleted_file_is_missing_against_a_fresh_log() {
    let temp = TempDir::new().unwrap();
    let (source, item) = source_tree(&temp);
    let area = StagingArea::create(temp.path().join("staging")).unwrap();
    let folder = area.allocate_folder("acc").unwrap();
    folder.copy_in(&source, &item).unwrap();
    let origin = hash_into(
        &DirectoryBatch::new(&source, &item).unwrap(),
        &folder.admin_file(ORIGIN_LOG),
        false,
    );

    fs::remove_file(folder.data_dir.join("2015-123/mvol/0001/0002/0003/notes.txt")).unwrap();
    let staged = hash_into(
        &folder.data_batch().unwrap(),
        &folder.admin_file(STAGED_LOG),
        false,
    );

    let report = Reconciler::report(&origin, &staged);
    assert_eq!(report.summary.missing, 1);
    let missing: Vec<_> = report.entries_in(Classification::Missing).collect();
    assert_eq!(missing[0].key, "2015-123/mvol/0001/0002/0003/notes.txt");
    assert!(missing[0].staged_digest.is_none());
}

#[test]
fn interrupted_log_resumes_without_rehashing_complete_records() {
    let temp = TempDir::new().unwrap();
    let (source, item) = source_tree(&temp);
    let batch = DirectoryBatch::new(&source, &item).unwrap();
    let descriptors = batch.descriptors().unwrap();
    let log_path = temp.path().join("admin").join(ORIGIN_LOG);

    let complete = FixityHasher::new(HashAlgorithm::Sha256).hash_batch(&descriptors, None);
    let first = descriptors[0].canonical_path.clone();
    let second = descriptors[1].canonical_path.clone();

    // One record made it to disk; the next was cut off mid-digest
    let mut writer = FixityLogWriter::open(&log_path).unwrap();
    assert_eq!(writer.path(), log_path.as_path());
    writer.append(complete.log.get(&first).unwrap()).unwrap();
    drop(writer);
    let torn = &complete.log.get(&second).unwrap().digest[..10];
    let mut content = fs::read_to_string(&log_path).unwrap();
    content.push_str(&format!("{}\t{}", second, torn));
    fs::write(&log_path, content).unwrap();

    let prior = FixityLog::load(&log_path).unwrap();
    assert_eq!(prior.len(), 1);
    assert!(!prior.contains_key(&second));

    let outcome = FixityHasher::new(HashAlgorithm::Sha256)
        .hash_to_log(&descriptors, Some(&prior), &log_path)
        .unwrap();
    assert_eq!(outcome.carried_forward, 1);
    assert_eq!(outcome.hashed, 2);
    assert_eq!(outcome.appended, 2);
    for descriptor in &descriptors {
        assert_eq!(
            outcome.log.lookup(&descriptor.canonical_path),
            complete.log.lookup(&descriptor.canonical_path)
        );
    }

    let on_disk = fs::read_to_string(&log_path).unwrap();
    assert_eq!(on_disk.lines().count(), 3);
    assert!(!on_disk.contains(&format!("{}\t{}\n", second, torn)));
    assert_eq!(FixityLog::load(&log_path).unwrap(), outcome.log);
}

#[test]
fn origin_and_staged_keys_agree_for_nested_items() {
    let temp = TempDir::new().unwrap();
    let (source, _) = source_tree(&temp);
    let nested = source.join("2015-123/mvol/0001/0002/0003/TIFF");
    let area = StagingArea::create(temp.path().join("staging")).unwrap();
    let folder = area.allocate_folder("acc").unwrap();
    folder.copy_in(&source, &nested).unwrap();

    let origin: Vec<_> = DirectoryBatch::new(&source, &nested)
        .unwrap()
        .descriptors()
        .unwrap()
        .into_iter()
        .map(|d| d.canonical_path)
        .collect();
    let staged: Vec<_> = folder
        .data_batch()
        .unwrap()
        .descriptors()
        .unwrap()
        .into_iter()
        .map(|d| d.canonical_path)
        .collect();
    assert_eq!(origin.len(), 2);
    assert_eq!(origin, staged);
}
