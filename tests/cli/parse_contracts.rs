use std::path::PathBuf;

use clap::Parser;
use reliquary::fixity::HashAlgorithm;
use reliquary::tooling::cli::{Cli, CliContext, Commands};
use reliquary::tooling::OutputFormat;

use crate::cli::support::StagingFixture;

#[test]
fn global_flags_precede_the_subcommand() {
    let cli = Cli::try_parse_from([
        "reliquary",
        "-v",
        "--log-format",
        "json",
        "assemble",
        "data/acc1",
        "--object-level",
        "4",
        "--format",
        "json",
    ])
    .unwrap();

    assert!(cli.verbose);
    assert_eq!(cli.log_format.as_deref(), Some("json"));
    assert_eq!(cli.workspace, PathBuf::from("."));
    match cli.command {
        Commands::Assemble {
            root,
            object_level,
            format,
            extract_metadata,
            ..
        } => {
            assert_eq!(root, PathBuf::from("data/acc1"));
            assert_eq!(object_level, Some(4));
            assert_eq!(format, OutputFormat::Json);
            assert!(!extract_metadata);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn negative_object_level_reaches_validation() {
    let cli = Cli::try_parse_from([
        "reliquary",
        "assemble",
        "data",
        "--object-level",
        "-1",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Assemble {
            object_level: Some(-1),
            ..
        }
    ));
}

#[test]
fn hash_commands_parse_algorithm_names() {
    let cli = Cli::try_parse_from([
        "reliquary",
        "hash-staged",
        "--staging-root",
        "/stage",
        "--folder",
        "acc1",
        "--algorithm",
        "blake3",
        "--rehash",
    ])
    .unwrap();
    match cli.command {
        Commands::HashStaged {
            folder,
            algorithm,
            rehash,
            format,
            ..
        } => {
            assert_eq!(folder, "acc1");
            assert_eq!(algorithm, Some(HashAlgorithm::Blake3));
            assert!(rehash);
            assert_eq!(format, OutputFormat::Text);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn unknown_algorithm_is_rejected() {
    let result = Cli::try_parse_from([
        "reliquary",
        "hash-staged",
        "--staging-root",
        "/stage",
        "--folder",
        "acc1",
        "--algorithm",
        "md5",
    ]);
    assert!(result.is_err());
}

#[test]
fn folder_is_required_for_audit() {
    let result = Cli::try_parse_from(["reliquary", "audit", "--staging-root", "/stage"]);
    assert!(result.is_err());
}

#[test]
fn unknown_output_format_is_rejected() {
    let result = Cli::try_parse_from([
        "reliquary",
        "validate",
        "--staging-root",
        "/stage",
        "--format",
        "yaml",
    ]);
    assert!(result.is_err());
}

#[test]
fn staging_commands_log_to_the_folder_run_log() {
    let fixture = StagingFixture::new();
    let context = fixture.context();
    fixture.staged_and_hashed(&context);
    let staging_root = fixture.staging_root.to_string_lossy().into_owned();

    let cli = Cli::try_parse_from([
        "reliquary",
        "audit",
        "--staging-root",
        staging_root.as_str(),
        "--folder",
        "acc1",
    ])
    .unwrap();
    let logging = context.logging_config(&cli);
    let run_log = logging.file.unwrap();
    assert!(run_log.ends_with("admin/acc1/log.txt"));
    assert_eq!(logging.output, "file+stderr");

    let explicit = Cli::try_parse_from([
        "reliquary",
        "--log-file",
        "/tmp/elsewhere.log",
        "--log-level",
        "warn",
        "audit",
        "--staging-root",
        staging_root.as_str(),
        "--folder",
        "acc1",
    ])
    .unwrap();
    let logging = context.logging_config(&explicit);
    assert_eq!(logging.file, Some(PathBuf::from("/tmp/elsewhere.log")));
    assert_eq!(logging.level, "warn");
}

#[test]
fn non_staging_commands_keep_configured_logging() {
    let fixture = StagingFixture::new();
    let context: CliContext = fixture.context();
    let cli = Cli::try_parse_from(["reliquary", "assemble", "data"]).unwrap();
    let logging = context.logging_config(&cli);
    assert_eq!(logging, context.config().logging);
}
