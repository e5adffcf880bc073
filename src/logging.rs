//! Logging System
//!
//! Structured logging built on `tracing`. Level, format and destinations come
//! from [`LoggingConfig`] with `RELIQUARY_LOG*` environment overrides.

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Resolve the log file path with precedence: CLI, RELIQUARY_LOG_FILE env, config file, default.
///
/// Default uses the `ProjectDirs` state directory and an optional
/// workspace-scoped path segment.
pub fn resolve_log_file_path(
    cli_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
    workspace: Option<&Path>,
) -> Result<PathBuf, ApiError> {
    if let Some(p) = cli_file {
        if !p.as_os_str().is_empty() {
            return Ok(p);
        }
    }
    if let Ok(env_path) = std::env::var("RELIQUARY_LOG_FILE") {
        if !env_path.is_empty() {
            return Ok(PathBuf::from(env_path));
        }
    }
    if let Some(p) = config_file {
        if !p.as_os_str().is_empty() {
            return Ok(p);
        }
    }
    default_log_file_path(workspace)
}

fn default_log_file_path(workspace: Option<&Path>) -> Result<PathBuf, ApiError> {
    let project_dirs = directories::ProjectDirs::from("", "reliquary", "reliquary").ok_or_else(|| {
        ApiError::ConfigError("Could not determine platform state directory for log file".to_string())
    })?;
    // Not every platform has a state dir
    let mut dir = project_dirs
        .state_dir()
        .unwrap_or_else(|| project_dirs.data_local_dir())
        .to_path_buf();
    if let Some(ws) = workspace {
        let canonical = dunce::canonicalize(ws).map_err(|e| {
            ApiError::ConfigError(format!("Failed to canonicalize workspace path: {}", e))
        })?;
        for component in canonical.components() {
            if let std::path::Component::Normal(name) = component {
                dir.push(name);
            }
        }
    }
    Ok(dir.join("reliquary.log"))
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file, file+stderr, both
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output includes file; None means use runtime default
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format only, stdout/stderr only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Route logs to `path` in addition to the configured console stream.
    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.file = Some(path);
        if !matches!(self.output.as_str(), "file" | "file+stderr") {
            self.output = "file+stderr".to_string();
        }
        self
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Initialize the logging system
///
/// Priority order (highest to lowest):
/// 1. Environment variables (RELIQUARY_LOG, RELIQUARY_LOG_FORMAT, etc.)
/// 2. CLI arguments, already folded into `config`
/// 3. Configuration file
/// 4. Defaults
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ApiError> {
    build_subscriber(config)?
        .try_init()
        .map_err(|e| ApiError::ConfigError(format!("Failed to install logger: {}", e)))
}

/// Build the subscriber [`init_logging`] installs.
///
/// Console streams follow the configured level. A log file gets its own
/// layer filtered at [`file_level`], so per-file detail always reaches it.
pub fn build_subscriber(
    config: Option<&LoggingConfig>,
) -> Result<impl tracing::Subscriber + Send + Sync + 'static, ApiError> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.map(|c| c.enabled).unwrap_or(true) {
        let json = determine_format(config)? == "json";
        let output = determine_output(config)?;
        let use_color = config.map(|c| c.color).unwrap_or(true);

        let console = if output.stdout && output.stderr {
            Some(BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)))
        } else if output.stderr {
            Some(BoxMakeWriter::new(std::io::stderr))
        } else if output.stdout {
            Some(BoxMakeWriter::new(std::io::stdout))
        } else {
            None
        };
        if let Some(writer) = console {
            layers.push(
                fmt_layer(writer, json, use_color)
                    .with_filter(build_env_filter(config)?)
                    .boxed(),
            );
        }

        if output.file {
            let log_file = resolve_log_file_path(None, config.and_then(|c| c.file.clone()), None)?;
            let file = Mutex::new(open_log_file(&log_file)?);
            layers.push(
                fmt_layer(BoxMakeWriter::new(file), json, false)
                    .with_filter(EnvFilter::new(file_level(config)))
                    .boxed(),
            );
        }
    }
    Ok(Registry::default().with(layers))
}

fn fmt_layer(writer: BoxMakeWriter, json: bool, ansi: bool) -> BoxedLayer {
    if json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(writer)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed()
    }
}

/// Level of the log file layer: debug, or trace when that is configured.
pub fn file_level(config: Option<&LoggingConfig>) -> &'static str {
    match config.map(|c| c.level.to_lowercase()).as_deref() {
        Some("trace") => "trace",
        _ => "debug",
    }
}

fn open_log_file(log_file: &Path) -> Result<std::fs::File, ApiError> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ApiError::ConfigError(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| ApiError::ConfigError(format!("Failed to open log file {:?}: {}", log_file, e)))
}

/// Build environment filter from config or environment variables
fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ApiError> {
    if let Ok(filter) = EnvFilter::try_from_env("RELIQUARY_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{}={}", module, module_level);
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| ApiError::ConfigError(format!("Invalid log directive: {}", e)))?,
            );
        }
    }

    if let Ok(modules_str) = std::env::var("RELIQUARY_LOG_MODULES") {
        for module_spec in modules_str.split(',') {
            if let Some((module, module_level)) = module_spec.split_once('=') {
                let directive = format!("{}={}", module.trim(), module_level.trim());
                filter = filter.add_directive(directive.parse().map_err(|e| {
                    ApiError::ConfigError(format!("Invalid log directive from env: {}", e))
                })?);
            }
        }
    }

    Ok(filter)
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<String, ApiError> {
    if let Ok(format) = std::env::var("RELIQUARY_LOG_FORMAT") {
        if format == "json" || format == "text" {
            return Ok(format);
        }
    }

    let format = config.map(|c| c.format.as_str()).unwrap_or("text");
    if format != "json" && format != "text" {
        return Err(ApiError::ConfigError(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            format
        )));
    }

    Ok(format.to_string())
}

/// Output destinations
#[derive(Debug, PartialEq, Eq)]
struct OutputDestinations {
    stdout: bool,
    stderr: bool,
    file: bool,
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<OutputDestinations, ApiError> {
    if let Ok(output) = std::env::var("RELIQUARY_LOG_OUTPUT") {
        return parse_output_destinations(&output);
    }
    let output = config.map(|c| c.output.as_str()).unwrap_or("stderr");
    parse_output_destinations(output)
}

fn parse_output_destinations(output: &str) -> Result<OutputDestinations, ApiError> {
    let (stdout, stderr, file) = match output {
        "stdout" => (true, false, false),
        "stderr" => (false, true, false),
        "file" => (false, false, true),
        "file+stderr" => (false, true, true),
        "both" => (true, true, false),
        _ => {
            return Err(ApiError::ConfigError(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr', 'file', 'file+stderr', or 'both')",
                output
            )))
        }
    };
    Ok(OutputDestinations {
        stdout,
        stderr,
        file,
    })
}

/// Validate level, format and output without installing a subscriber.
pub fn validate_logging_config(config: &LoggingConfig) -> Result<(), ApiError> {
    const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
    if !LEVELS.contains(&config.level.to_lowercase().as_str()) {
        return Err(ApiError::ConfigError(format!(
            "Invalid log level: {} (must be one of {})",
            config.level,
            LEVELS.join(", ")
        )));
    }
    determine_format(Some(config))?;
    parse_output_destinations(&config.output)?;
    Ok(())
}
