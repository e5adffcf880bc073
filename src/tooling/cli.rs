//! CLI Tooling
//!
//! Command-line interface for staging, fixity and assembly operations. Every
//! command renders its result as a string; the binary decides where it goes.

use crate::assembly::ObjectLevel;
use crate::batch::{Batch, DirectoryBatch};
use crate::config::{ConfigLoader, ReliquaryConfig};
use crate::error::ApiError;
use crate::fixity::{Classification, FixityLog, HashAlgorithm, Reconciler};
use crate::logging::LoggingConfig;
use crate::staging::{StagingArea, StagingFolder, RUN_LOG};
use crate::tooling::format::{
    audit_line, format_assembly, format_copy, format_hash_outcome, format_layout,
    format_reconciliation, OutputFormat,
};
use clap::{Parser, Subcommand};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Reliquary CLI - fixity and object assembly for archival staging
#[derive(Parser, Debug)]
#[command(name = "reliquary")]
#[command(about = "Fixity reconciliation and digital object assembly for archival staging areas")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (holds reliquary.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level unless --log-level is given)
    #[arg(long, short = 'v', default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path; staging commands default to admin/<folder>/log.txt
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create the next <prefix><n> folder pair in a staging area
    Prepare {
        /// Staging root containing data/ and admin/
        #[arg(long)]
        staging_root: PathBuf,
        /// Folder prefix (must not end in a digit)
        #[arg(long)]
        prefix: String,
        /// Create data/ and admin/ if the staging root is empty
        #[arg(long)]
        init: bool,
    },
    /// Copy an item from origin media into a staging folder
    Stage {
        /// File or directory to copy, under --source-root
        item: PathBuf,
        /// Root the item's path is taken relative to
        #[arg(long)]
        source_root: PathBuf,
        #[arg(long)]
        staging_root: PathBuf,
        /// Folder prefix for a new folder, or an existing folder name to resume
        #[arg(long)]
        prefix: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Hash an item on origin media into admin/<folder>/fixityFromOrigin.txt
    HashOrigin {
        /// File or directory to hash, under --source-root
        item: PathBuf,
        #[arg(long)]
        source_root: PathBuf,
        #[arg(long)]
        staging_root: PathBuf,
        #[arg(long)]
        folder: String,
        /// Recompute every digest instead of carrying existing ones forward
        #[arg(long)]
        rehash: bool,
        /// Override the configured algorithm (sha256, blake3)
        #[arg(long)]
        algorithm: Option<HashAlgorithm>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Hash staged content into admin/<folder>/fixityOnDisk.txt
    HashStaged {
        #[arg(long)]
        staging_root: PathBuf,
        #[arg(long)]
        folder: String,
        #[arg(long)]
        rehash: bool,
        #[arg(long)]
        algorithm: Option<HashAlgorithm>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Reconcile the origin and staged fixity logs of a folder
    Audit {
        #[arg(long)]
        staging_root: PathBuf,
        #[arg(long)]
        folder: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check the structure of a staging area
    Validate {
        #[arg(long)]
        staging_root: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Group a batch into digital objects and validate their components
    Assemble {
        /// Batch root; canonical paths are relative to it
        root: PathBuf,
        /// Directory under the root to walk (default: the root)
        #[arg(long)]
        directory: Option<PathBuf>,
        /// Override the configured object level
        #[arg(long, allow_hyphen_values = true)]
        object_level: Option<i64>,
        /// Only include canonical paths matching this regex
        #[arg(long)]
        filter: Option<String>,
        /// Read Dublin Core records and FITS sidecars
        #[arg(long)]
        extract_metadata: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Rendered output plus whether the result was free of problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub output: String,
    pub clean: bool,
}

impl CommandOutcome {
    fn clean(output: String) -> Self {
        Self {
            output,
            clean: true,
        }
    }
}

/// CLI context holding the resolved configuration
pub struct CliContext {
    workspace_root: PathBuf,
    config: ReliquaryConfig,
}

impl CliContext {
    /// Create a new CLI context, loading configuration for `workspace_root`.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = ConfigLoader::resolve(&workspace_root, config_path.as_deref())?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    /// Context with an already-built configuration.
    pub fn with_config(workspace_root: PathBuf, config: ReliquaryConfig) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &ReliquaryConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Logging configuration with CLI flags applied. Staging commands log to
    /// the folder's run log unless an explicit log file was given.
    pub fn logging_config(&self, cli: &Cli) -> LoggingConfig {
        let mut logging = self.config.logging.clone();
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        } else if cli.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(format) = &cli.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            logging.output = output.clone();
        }
        match &cli.log_file {
            Some(file) => logging.file = Some(file.clone()),
            None => {
                if let Some(run_log) = self.run_log_for(&cli.command) {
                    logging = logging.with_file(run_log);
                }
            }
        }
        logging
    }

    /// `admin/<folder>/log.txt` for commands that operate on an existing folder.
    pub fn run_log_for(&self, command: &Commands) -> Option<PathBuf> {
        let (staging_root, folder) = match command {
            Commands::HashOrigin {
                staging_root,
                folder,
                ..
            }
            | Commands::HashStaged {
                staging_root,
                folder,
                ..
            }
            | Commands::Audit {
                staging_root,
                folder,
                ..
            } => (staging_root, folder),
            _ => return None,
        };
        let folder = StagingArea::open(staging_root).ok()?.open_folder(folder).ok()?;
        Some(folder.run_log_path())
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        self.execute_report(command).map(|outcome| outcome.output)
    }

    /// Execute a CLI command, reporting whether its result was clean.
    pub fn execute_report(&self, command: &Commands) -> Result<CommandOutcome, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(command = name, "BEGINS");
        let result = self.execute_inner(command);
        match &result {
            Ok(outcome) => info!(
                command = name,
                clean = outcome.clean,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "ENDS: COMPLETE"
            ),
            Err(e) => tracing::error!(command = name, error = %e, "ENDS: failed"),
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<CommandOutcome, ApiError> {
        match command {
            Commands::Prepare {
                staging_root,
                prefix,
                init,
            } => self.handle_prepare(staging_root, prefix, *init),
            Commands::Stage {
                item,
                source_root,
                staging_root,
                prefix,
                format,
            } => self.handle_stage(item, source_root, staging_root, prefix, *format),
            Commands::HashOrigin {
                item,
                source_root,
                staging_root,
                folder,
                rehash,
                algorithm,
                format,
            } => {
                let folder = open_folder(staging_root, folder)?;
                let batch = DirectoryBatch::new(source_root, item)?;
                let log_path = folder.admin_file(&self.config.fixity.origin_log);
                self.handle_hash(&batch, &log_path, *rehash, *algorithm, *format)
            }
            Commands::HashStaged {
                staging_root,
                folder,
                rehash,
                algorithm,
                format,
            } => {
                let folder = open_folder(staging_root, folder)?;
                let batch = folder.data_batch()?;
                let log_path = folder.admin_file(&self.config.fixity.staged_log);
                self.handle_hash(&batch, &log_path, *rehash, *algorithm, *format)
            }
            Commands::Audit {
                staging_root,
                folder,
                format,
            } => self.handle_audit(&open_folder(staging_root, folder)?, *format),
            Commands::Validate {
                staging_root,
                format,
            } => self.handle_validate(staging_root, *format),
            Commands::Assemble {
                root,
                directory,
                object_level,
                filter,
                extract_metadata,
                format,
            } => self.handle_assemble(
                root,
                directory.as_deref(),
                *object_level,
                filter.as_deref(),
                *extract_metadata,
                *format,
            ),
        }
    }

    fn handle_prepare(&self, staging_root: &Path, prefix: &str, init: bool) -> Result<CommandOutcome, ApiError> {
        let area = if init {
            StagingArea::create(staging_root)?
        } else {
            StagingArea::open(staging_root)?
        };
        let folder = area.allocate_folder(prefix)?;
        // Bare folder name so the output can be chained into later commands
        Ok(CommandOutcome::clean(folder.name))
    }

    fn handle_stage(
        &self,
        item: &Path,
        source_root: &Path,
        staging_root: &Path,
        prefix: &str,
        format: OutputFormat,
    ) -> Result<CommandOutcome, ApiError> {
        let area = StagingArea::open(staging_root)?;
        let folder = area.resolve_folder(prefix)?;
        let summary = folder.copy_in(source_root, item)?;
        Ok(CommandOutcome::clean(format_copy(&summary, &folder, format)?))
    }

    fn handle_hash<B: Batch>(
        &self,
        batch: &B,
        log_path: &Path,
        rehash: bool,
        algorithm: Option<HashAlgorithm>,
        format: OutputFormat,
    ) -> Result<CommandOutcome, ApiError> {
        let prior = if rehash {
            info!("Rehash requested, not reading existing hashes");
            None
        } else {
            Some(FixityLog::load(log_path)?)
        };
        let descriptors = batch.descriptors()?;
        info!(files = descriptors.len(), log = %log_path.display(), "Hashing files");

        let hasher = self
            .config
            .fixity
            .build_hasher(algorithm)
            .force_rehash(rehash);
        let outcome = hasher.hash_to_log(&descriptors, prior.as_ref(), log_path)?;
        Ok(CommandOutcome::clean(format_hash_outcome(&outcome, log_path, format)?))
    }

    fn handle_audit(&self, folder: &StagingFolder, format: OutputFormat) -> Result<CommandOutcome, ApiError> {
        let origin_path = folder.admin_file(&self.config.fixity.origin_log);
        let staged_path = folder.admin_file(&self.config.fixity.staged_log);
        for (path, command) in [(&origin_path, "hash-origin"), (&staged_path, "hash-staged")] {
            if !path.is_file() {
                return Err(ApiError::Staging(format!(
                    "{} does not exist; run `reliquary {}` first",
                    path.display(),
                    command
                )));
            }
        }

        let origin = FixityLog::load(&origin_path)?;
        let staged = FixityLog::load(&staged_path)?;
        if let Some((theirs, ours)) = Reconciler::algorithm_mismatch(&origin, &staged) {
            return Err(ApiError::ConfigError(format!(
                "{} is recorded with {} in {} but {} in {}; rerun `reliquary hash-staged --algorithm {}`",
                theirs.key,
                theirs.algorithm,
                origin_path.display(),
                ours.algorithm,
                staged_path.display(),
                theirs.algorithm
            )));
        }
        let report = Reconciler::report(&origin, &staged);

        for entry in &report.entries {
            let digest = entry
                .origin_digest
                .as_deref()
                .or(entry.staged_digest.as_deref());
            let digest = match entry.classification {
                Classification::Unexpected => None,
                _ => digest,
            };
            debug!("{}", audit_line(entry.classification, &entry.key, digest));
        }
        let summary = &report.summary;
        info!("{} file(s) total in the staging area.", summary.staged_files);
        info!("{} file(s) not copied.", summary.missing);
        info!("{} file(s) have a different hash from the origin.", summary.corrupted);
        info!("{} file(s) appear to not have come from the origin.", summary.unexpected);

        Ok(CommandOutcome {
            output: format_reconciliation(&report, format)?,
            clean: report.is_clean(),
        })
    }

    fn handle_validate(&self, staging_root: &Path, format: OutputFormat) -> Result<CommandOutcome, ApiError> {
        let area = StagingArea::open(staging_root)?;
        let fixity = &self.config.fixity;
        let report = area.validate(&[fixity.origin_log.as_str(), fixity.staged_log.as_str(), RUN_LOG])?;
        Ok(CommandOutcome {
            output: format_layout(&report, format)?,
            clean: report.is_valid(),
        })
    }

    fn handle_assemble(
        &self,
        root: &Path,
        directory: Option<&Path>,
        object_level: Option<i64>,
        filter: Option<&str>,
        extract_metadata: bool,
        format: OutputFormat,
    ) -> Result<CommandOutcome, ApiError> {
        let level = object_level.map(ObjectLevel::new).transpose()?;
        let assembler = self
            .config
            .assembly
            .build_assembler(level)?
            .with_metadata_extraction(extract_metadata);

        let mut batch = match directory {
            Some(dir) => DirectoryBatch::new(root, dir)?,
            None => DirectoryBatch::rooted_at(root)?,
        };
        if let Some(pattern) = filter {
            let regex = Regex::new(pattern).map_err(|source| ApiError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            batch = batch.with_filter(regex);
        }

        let report = assembler.assemble_batch(&batch)?;
        info!(
            objects = report.objects.len(),
            complete = report.complete_count(),
            unresolved = report.unresolved.len(),
            "Assembly complete"
        );
        Ok(CommandOutcome {
            output: format_assembly(&report, format)?,
            clean: report.is_clean(),
        })
    }
}

fn open_folder(staging_root: &Path, folder: &str) -> Result<StagingFolder, ApiError> {
    StagingArea::open(staging_root)?.open_folder(folder)
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Prepare { .. } => "prepare",
        Commands::Stage { .. } => "stage",
        Commands::HashOrigin { .. } => "hash-origin",
        Commands::HashStaged { .. } => "hash-staged",
        Commands::Audit { .. } => "audit",
        Commands::Validate { .. } => "validate",
        Commands::Assemble { .. } => "assemble",
    }
}
