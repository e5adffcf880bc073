use std::fs;

use reliquary::staging::{StagingArea, COPY_MANIFEST, RUN_LOG};
use tempfile::TempDir;

const REQUIRED: [&str; 3] = ["fixityFromOrigin.txt", "fixityOnDisk.txt", RUN_LOG];

#[test]
fn layout_is_valid_once_every_admin_file_exists() {
    let temp = TempDir::new().unwrap();
    let area = StagingArea::create(temp.path().join("staging")).unwrap();
    let folder = area.allocate_folder("acc").unwrap();
    fs::write(folder.admin_file(REQUIRED[0]), "").unwrap();
    fs::write(folder.admin_file(REQUIRED[1]), "").unwrap();

    let report = area.validate(&REQUIRED).unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.folders, vec!["acc1".to_string()]);
    assert_eq!(report.incomplete_admin["acc1"], vec![RUN_LOG.to_string()]);

    fs::write(folder.run_log_path(), "").unwrap();
    let report = area.validate(&REQUIRED).unwrap();
    assert!(report.is_valid());
}

#[test]
fn unpaired_folders_and_stray_files_are_reported() {
    let temp = TempDir::new().unwrap();
    let area = StagingArea::create(temp.path()).unwrap();
    fs::create_dir(area.data_root().join("acc1")).unwrap();
    fs::create_dir(area.admin_root().join("acc2")).unwrap();
    fs::write(area.data_root().join("loose.txt"), "x").unwrap();

    let report = area.validate(&[]).unwrap();
    assert_eq!(report.only_in_data, vec!["acc1".to_string()]);
    assert_eq!(report.only_in_admin, vec!["acc2".to_string()]);
    assert_eq!(report.non_directories, vec!["data/loose.txt".to_string()]);
    assert!(report.folders.is_empty());
    assert!(!report.is_valid());
}

#[test]
fn resumed_folder_continues_an_interrupted_copy() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let item = source.join("2015-123");
    fs::create_dir_all(item.join("box1")).unwrap();
    fs::write(item.join("box1/a.tif"), "aaaa").unwrap();
    fs::write(item.join("box1/b.tif"), "bbbb").unwrap();

    let area = StagingArea::create(temp.path().join("staging")).unwrap();
    let first = area.resolve_folder("acc").unwrap();
    fs::create_dir_all(first.data_dir.join("2015-123/box1")).unwrap();
    fs::write(first.data_dir.join("2015-123/box1/a.tif"), "aaaa").unwrap();

    let resumed = area.resolve_folder("acc1").unwrap();
    assert_eq!(resumed, first);
    let summary = resumed.copy_in(&source, &item).unwrap();
    assert_eq!(summary.copied, 1);
    assert_eq!(summary.skipped, 1);
    assert!(resumed.admin_file(COPY_MANIFEST).is_file());

    let next = area.resolve_folder("acc").unwrap();
    assert_eq!(next.name, "acc2");
    assert!(area.resolve_folder("acc9").is_err());
}
