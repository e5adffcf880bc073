use std::fs;
use std::path::Path;

use reliquary::assembly::{
    MetadataExtension, ObjectAssembler, ObjectLevel, PageGap, SequenceCheck,
};
use reliquary::batch::DirectoryBatch;
use reliquary::config::AssemblyConfig;
use reliquary::error::AssemblyError;
use tempfile::TempDir;

const DC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>University of Chicago Magazine</dc:title>
  <dc:date>1923</dc:date>
  <dc:identifier>mvol-0001-0002-0003</dc:identifier>
</metadata>"#;

const FITS: &str = r#"<fits xmlns="http://hul.harvard.edu/ois/xml/ns/fits/fits_output">
  <fileinfo><md5checksum>0cc175b9c0f1b6a831c399e269772661</md5checksum></fileinfo>
  <metadata><image>
    <imageWidth>1700</imageWidth>
    <imageHeight>2200</imageHeight>
    <bitsPerSample>8</bitsPerSample>
  </image></metadata>
</fits>"#;

fn touch(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// `2015-123/mvol/<a>/<b>/<c>/` with the usual digitization layout.
fn write_volume(root: &Path, volume: &str, pages: &[u32]) {
    let id = format!("mvol-{}", volume.replace('/', "-"));
    let base = format!("2015-123/mvol/{}", volume);
    touch(root, &format!("{base}/{id}.dc.xml"), DC);
    touch(root, &format!("{base}/{id}.pdf"), "%PDF-1.4");
    touch(root, &format!("{base}/{id}.mets.xml"), "<mets/>");
    for page in pages {
        touch(root, &format!("{base}/ALTO/{id}_{page:04}.xml"), "<alto/>");
        touch(root, &format!("{base}/TIFF/{id}_{page:04}.tif"), "II*");
        touch(root, &format!("{base}/JPEG/{id}_{page:04}.jpg"), "JFIF");
    }
}

fn default_assembler() -> ObjectAssembler {
    AssemblyConfig::default()
        .build_assembler(Some(ObjectLevel::new(4).unwrap()))
        .unwrap()
}

#[test]
fn complete_volume_assembles_clean() {
    let temp = TempDir::new().unwrap();
    write_volume(temp.path(), "0001/0002/0003", &[1, 2, 3]);

    let batch = DirectoryBatch::rooted_at(temp.path()).unwrap();
    let report = default_assembler().assemble_batch(&batch).unwrap();

    assert!(report.unresolved.is_empty());
    assert_eq!(report.objects.len(), 1);
    let object = report.object("mvol-0001-0002-0003").unwrap();
    assert_eq!(object.object.member_count(), 12);
    assert_eq!(
        object.descriptive_metadata.as_deref(),
        Some("2015-123/mvol/0001/0002/0003/mvol-0001-0002-0003.dc.xml")
    );
    assert_eq!(
        object.representation.as_deref(),
        Some("2015-123/mvol/0001/0002/0003/mvol-0001-0002-0003.pdf")
    );
    assert_eq!(object.sequences.len(), 3);
    for check in &object.sequences {
        let gaps = check.gap_report().unwrap();
        assert_eq!(gaps.expected_max, 3);
        assert!(gaps.missing.is_empty());
    }
    assert!(object.unclassified.is_empty());
    assert!(object.is_complete());
    assert!(report.is_clean());
}

#[test]
fn one_bad_volume_does_not_block_its_neighbours() {
    let temp = TempDir::new().unwrap();
    write_volume(temp.path(), "0001/0002/0003", &[1, 2]);
    write_volume(temp.path(), "0001/0002/0004", &[1, 2, 4]);
    touch(
        temp.path(),
        "2015-123/mvol/0001/0002/0004/mvol-0001-0002-0004.alt.pdf",
        "%PDF-1.4",
    );
    touch(temp.path(), "2015-123/mvol/README.txt", "shallow");

    let batch = DirectoryBatch::rooted_at(temp.path()).unwrap();
    let report = default_assembler().assemble_batch(&batch).unwrap();

    let identifiers: Vec<_> = report.objects.iter().map(|o| o.identifier()).collect();
    assert_eq!(identifiers, vec!["mvol-0001-0002-0003", "mvol-0001-0002-0004"]);
    assert_eq!(report.complete_count(), 1);
    assert!(!report.is_clean());

    let bad = report.object("mvol-0001-0002-0004").unwrap();
    assert_eq!(bad.ambiguous_roles, vec!["pdf".to_string()]);
    assert_eq!(bad.representation, None);
    assert_eq!(bad.object.members_for("pdf").len(), 2);
    let gaps: Vec<_> = bad.sequence_gaps().collect();
    assert_eq!(gaps.len(), 3);
    assert!(gaps.iter().all(|(_, missing)| *missing == [PageGap::single(3)]));

    assert!(matches!(
        &report.unresolved[..],
        [AssemblyError::MalformedPath { path, level: 4, segments: 2 }]
            if path == "2015-123/mvol/README.txt"
    ));
    assert!(report
        .errors()
        .any(|e| matches!(e, AssemblyError::AmbiguousRole { .. })));
}

#[test]
fn missing_sequence_is_reported_as_missing_role() {
    let temp = TempDir::new().unwrap();
    write_volume(temp.path(), "0001/0002/0003", &[1]);
    fs::remove_dir_all(temp.path().join("2015-123/mvol/0001/0002/0003/JPEG")).unwrap();

    let batch = DirectoryBatch::rooted_at(temp.path()).unwrap();
    let report = default_assembler().assemble_batch(&batch).unwrap();
    let object = &report.objects[0];

    assert_eq!(object.missing_roles, vec!["JPEG".to_string()]);
    assert!(object
        .sequences
        .iter()
        .any(|c| matches!(c, SequenceCheck::NoSequence { role } if role == "JPEG")));
    assert!(!object.is_complete());
}

#[test]
fn filtered_batch_assembles_only_matching_files() {
    let temp = TempDir::new().unwrap();
    write_volume(temp.path(), "0001/0002/0003", &[1, 2]);

    let batch = DirectoryBatch::rooted_at(temp.path())
        .unwrap()
        .with_filter(regex::Regex::new(r"/TIFF/").unwrap());
    let report = default_assembler().assemble_batch(&batch).unwrap();
    let object = &report.objects[0];

    assert_eq!(object.object.member_count(), 2);
    assert!(object.missing_roles.contains(&"dc.xml".to_string()));
    let checked: Vec<_> = object
        .sequences
        .iter()
        .filter_map(|c| c.gap_report())
        .map(|g| g.role.as_str())
        .collect();
    assert_eq!(checked, vec!["TIFF"]);
    assert_eq!(object.sequence_gaps().count(), 0);
}

#[test]
fn metadata_extraction_reads_dublin_core_and_sidecars() {
    let temp = TempDir::new().unwrap();
    write_volume(temp.path(), "0001/0002/0003", &[1, 2]);
    let tiff = "2015-123/mvol/0001/0002/0003/TIFF/mvol-0001-0002-0003";
    touch(temp.path(), &format!("{tiff}_0001.tif.fits.xml"), FITS);
    touch(temp.path(), &format!("{tiff}_0002.tif.fits.xml"), FITS);

    let batch = DirectoryBatch::rooted_at(temp.path()).unwrap();
    let report = default_assembler()
        .with_metadata_extraction(true)
        .assemble_batch(&batch)
        .unwrap();
    let object = &report.objects[0];

    // Sidecars are members but fill no role
    assert_eq!(object.sidecars.len(), 2);
    assert!(object.is_complete());

    match &object.extensions["dc.xml"][..] {
        [MetadataExtension::Descriptive(dc)] => {
            assert_eq!(dc.title.as_deref(), Some("University of Chicago Magazine"));
            assert_eq!(dc.date.as_deref(), Some("1923"));
        }
        other => panic!("unexpected descriptive extensions: {other:?}"),
    }
    let tiff_meta = &object.extensions["TIFF"];
    assert_eq!(tiff_meta.len(), 2);
    assert!(tiff_meta.iter().all(|ext| matches!(
        ext,
        MetadataExtension::ImageTechnical(tech) if tech.image_width == Some(1700)
    )));

    // JPEG derivatives are never looked up for sidecars
    assert!(!object.extensions.contains_key("JPEG"));
    assert!(object.warnings.is_empty(), "unexpected warnings: {:?}", object.warnings);
}

#[test]
fn header_stripping_can_be_disabled() {
    let temp = TempDir::new().unwrap();
    write_volume(temp.path(), "0001/0002/0003", &[1]);

    let config = AssemblyConfig {
        header_pattern: None,
        ..AssemblyConfig::default()
    };
    let assembler = config
        .build_assembler(Some(ObjectLevel::new(2).unwrap()))
        .unwrap();
    let batch = DirectoryBatch::rooted_at(temp.path()).unwrap();
    let report = assembler.assemble_batch(&batch).unwrap();

    assert_eq!(report.objects.len(), 1);
    assert_eq!(report.objects[0].identifier(), "2015-123-mvol");
}
