//! Configuration schema definitions for regtest-collector.
//!
//! Every section and every field has a default, so an empty file (or no file
//! at all) is a valid configuration.
//!
//! # Schema Overview
//!
//! ```text
//! Config (root)
//! ├── CollectorConfig        - Interpreter, file patterns, working-copy edits
//! │   └── ScriptTransform    - [collector.transform]
//! ├── StrategyConfig         - Tagged enum selecting the collection strategy
//! │   ├── InProcess          - Scan launchers below a root directory
//! │   └── Delegated          - Parse the report of an orchestrator script
//! ├── CommandConfig          - Path style and Linux substitutions
//! └── ReportConfig           - Where collection results are saved
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::{
    CommandBuilder, DEFAULT_LINUX_BUILD_CONFIG, DEFAULT_LINUX_HOME, DEFAULT_WINDOWS_BUILD_CONFIG,
};
use crate::parser::batch::DEFAULT_QUALIFIER;
use crate::parser::report::ReportMarkers;
use crate::paths::PathStyle;
use crate::script::ScriptTransform;
use crate::strategy::in_process::{DEFAULT_BATCH_PATTERN, DEFAULT_SCRIPT_PATTERN};

/// Root configuration structure.
///
/// # TOML Structure
///
/// ```toml
/// [collector]
/// interpreter = "python3"
/// timeout_secs = 120
///
/// [collector.transform]
/// replacement = "print(command)"
///
/// [strategy]
/// type = "in_process"
/// root = "~/work/regression"
///
/// [command]
/// path_style = "windows"
/// linux_home = "/home/ci/.vs"
///
/// [report]
/// output = "regtest-results.json"
/// ```
///
/// # Example
///
/// ```
/// use regtest_collector::config::{Config, StrategyConfig};
///
/// let config: Config = toml::from_str(r#"
///     [strategy]
///     type = "delegated"
///     script = "collect.py"
/// "#).unwrap();
///
/// assert!(matches!(config.strategy, StrategyConfig::Delegated { .. }));
/// assert_eq!(config.collector.interpreter, "python");
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub strategy: StrategyConfig,

    #[serde(default)]
    pub command: CommandConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Settings shared by every collection pass.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `interpreter` | `python` |
/// | `batch_pattern` | `RegressionTest*.bat` |
/// | `script_pattern` | `RegTest*.py` |
/// | `qualifier` | `regtest.exe` |
/// | `timeout_secs` | None (no limit) |
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectorConfig {
    /// Program used to run validation and orchestrator scripts.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// File name pattern of launcher batch files.
    #[serde(default = "default_batch_pattern")]
    pub batch_pattern: String,

    /// File name pattern of validation scripts.
    #[serde(default = "default_script_pattern")]
    pub script_pattern: String,

    /// Prefix of the launcher line holding the `key=value` arguments.
    #[serde(default = "default_qualifier")]
    pub qualifier: String,

    /// Per-script time limit in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Edits applied to validation scripts before they are run.
    #[serde(default)]
    pub transform: ScriptTransform,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            batch_pattern: default_batch_pattern(),
            script_pattern: default_script_pattern(),
            qualifier: default_qualifier(),
            timeout_secs: None,
            transform: ScriptTransform::default(),
        }
    }
}

impl CollectorConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_interpreter() -> String {
    "python".to_string()
}

fn default_batch_pattern() -> String {
    DEFAULT_BATCH_PATTERN.to_string()
}

fn default_script_pattern() -> String {
    DEFAULT_SCRIPT_PATTERN.to_string()
}

fn default_qualifier() -> String {
    DEFAULT_QUALIFIER.to_string()
}

/// Strategy selection, tagged by `type`.
///
/// | Type | Description |
/// |------|-------------|
/// | `in_process` | Scan `root` for launchers and run each validation script |
/// | `delegated` | Run `script` and parse the report it prints or writes |
///
/// ```toml
/// [strategy]
/// type = "delegated"
/// script = "tools/collect_regtests.py"
/// read_results_file = true
///
/// [strategy.markers]
/// command = "se.exe"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    InProcess {
        /// Directory searched recursively for launchers.
        #[serde(default = "default_root")]
        root: PathBuf,
    },
    Delegated {
        /// Orchestrator script run with the interpreter.
        script: PathBuf,

        #[serde(default)]
        markers: ReportMarkers,

        /// Read `<stem>Results.txt` instead of stdout.
        #[serde(default)]
        read_results_file: bool,
    },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::InProcess {
            root: default_root(),
        }
    }
}

impl StrategyConfig {
    /// Name matching the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InProcess { .. } => "in_process",
            Self::Delegated { .. } => "delegated",
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Settings for rebuilding reproduction commands.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandConfig {
    /// Path convention of the stored commands. Defaults to the host's.
    #[serde(default = "PathStyle::native")]
    pub path_style: PathStyle,

    /// Home directory substituted for the root on Linux targets.
    #[serde(default = "default_linux_home")]
    pub linux_home: String,

    #[serde(default = "default_windows_build_config")]
    pub windows_build_config: String,

    #[serde(default = "default_linux_build_config")]
    pub linux_build_config: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            path_style: PathStyle::native(),
            linux_home: default_linux_home(),
            windows_build_config: default_windows_build_config(),
            linux_build_config: default_linux_build_config(),
        }
    }
}

impl CommandConfig {
    pub fn builder(&self) -> CommandBuilder {
        CommandBuilder::new(self.path_style)
            .with_linux_home(&self.linux_home)
            .with_build_configs(&self.windows_build_config, &self.linux_build_config)
    }
}

fn default_linux_home() -> String {
    DEFAULT_LINUX_HOME.to_string()
}

fn default_windows_build_config() -> String {
    DEFAULT_WINDOWS_BUILD_CONFIG.to_string()
}

fn default_linux_build_config() -> String {
    DEFAULT_LINUX_BUILD_CONFIG.to_string()
}

/// Where `collect` saves its results.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// JSON file written after every pass and read by `list`, `command` and
    /// `debug-copy`.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("regtest-results.json")
}

impl Config {
    /// Expands a leading `~` and environment variables in every path field.
    pub fn expand_paths(&mut self) {
        match &mut self.strategy {
            StrategyConfig::InProcess { root } => *root = expand_path(root),
            StrategyConfig::Delegated { script, .. } => *script = expand_path(script),
        }
        self.report.output = expand_path(&self.report.output);
    }
}

/// Expands `~` and `$VAR` in `path`, leaving it unchanged when expansion
/// fails or the path is not valid UTF-8.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => match shellexpand::full(raw) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => path.to_path_buf(),
        },
        None => path.to_path_buf(),
    }
}
