use std::fs;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use reliquary::config::ReliquaryConfig;
use reliquary::tooling::cli::{CliContext, CommandOutcome, Commands};
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with `XDG_CONFIG_HOME` pointing inside `temp_dir`, so no user
/// configuration leaks into the test.
pub fn with_xdg_env<F: FnOnce()>(temp_dir: &TempDir, f: F) {
    let _guard = ENV_LOCK.lock();
    let previous = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path().join("xdg"));

    let result = catch_unwind(AssertUnwindSafe(f));

    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    if let Err(panic) = result {
        resume_unwind(panic);
    }
}

/// A source accession holding one two-page volume, and an empty staging root.
pub struct StagingFixture {
    pub temp: TempDir,
    pub source_root: PathBuf,
    pub item: PathBuf,
    pub staging_root: PathBuf,
}

pub const VOLUME: &str = "2015-123/mvol/0001/0002/0003";

impl StagingFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let source_root = temp.path().join("source");
        let item = source_root.join("2015-123");
        let volume = source_root.join(VOLUME);
        let id = "mvol-0001-0002-0003";

        write(&volume.join(format!("{id}.dc.xml")), "<dc:title>Volume</dc:title>");
        write(&volume.join(format!("{id}.pdf")), "%PDF-1.4");
        write(&volume.join(format!("{id}.mets.xml")), "<mets/>");
        for page in 1..=2 {
            write(&volume.join(format!("ALTO/{id}_{page:04}.xml")), "<alto/>");
            write(&volume.join(format!("TIFF/{id}_{page:04}.tif")), &format!("tiff {page}"));
            write(&volume.join(format!("JPEG/{id}_{page:04}.jpg")), &format!("jpeg {page}"));
        }

        let staging_root = temp.path().join("staging");
        Self {
            temp,
            source_root,
            item,
            staging_root,
        }
    }

    /// Context on compiled defaults, independent of any config file.
    pub fn context(&self) -> CliContext {
        CliContext::with_config(self.temp.path().to_path_buf(), ReliquaryConfig::default()).unwrap()
    }

    pub fn data_dir(&self, folder: &str) -> PathBuf {
        self.staging_root.join("data").join(folder)
    }

    pub fn admin_dir(&self, folder: &str) -> PathBuf {
        self.staging_root.join("admin").join(folder)
    }

    /// Allocate and fill `acc1`, then hash both sides.
    pub fn staged_and_hashed(&self, cli: &CliContext) -> String {
        let folder = run(
            cli,
            &Commands::Prepare {
                staging_root: self.staging_root.clone(),
                prefix: "acc".to_string(),
                init: true,
            },
        )
        .output;
        run(cli, &self.stage(&folder));
        run(cli, &self.hash_origin(&folder, false));
        run(cli, &self.hash_staged(&folder, false));
        folder
    }

    pub fn stage(&self, prefix: &str) -> Commands {
        Commands::Stage {
            item: self.item.clone(),
            source_root: self.source_root.clone(),
            staging_root: self.staging_root.clone(),
            prefix: prefix.to_string(),
            format: json(),
        }
    }

    pub fn hash_origin(&self, folder: &str, rehash: bool) -> Commands {
        Commands::HashOrigin {
            item: self.item.clone(),
            source_root: self.source_root.clone(),
            staging_root: self.staging_root.clone(),
            folder: folder.to_string(),
            rehash,
            algorithm: None,
            format: json(),
        }
    }

    pub fn hash_staged(&self, folder: &str, rehash: bool) -> Commands {
        Commands::HashStaged {
            staging_root: self.staging_root.clone(),
            folder: folder.to_string(),
            rehash,
            algorithm: None,
            format: json(),
        }
    }

    pub fn audit(&self, folder: &str) -> Commands {
        Commands::Audit {
            staging_root: self.staging_root.clone(),
            folder: folder.to_string(),
            format: json(),
        }
    }
}

fn json() -> reliquary::tooling::OutputFormat {
    reliquary::tooling::OutputFormat::Json
}

pub fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn run(cli: &CliContext, command: &Commands) -> CommandOutcome {
    cli.execute_report(command).unwrap()
}

pub fn parse_json(output: &str) -> serde_json::Value {
    serde_json::from_str(output).unwrap()
}
