//! Data model shared by the parsers, the collection strategies and the
//! on-demand command/script utilities.
//!
//! Everything here is a plain value: a discovery pass produces a fresh
//! [`CollectionResult`] and nothing in it is shared with the next pass.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Flat `key=value` arguments extracted from a launcher batch file.
pub type BatchArguments = HashMap<String, String>;

/// One reconstructable regression test.
///
/// The `root_dir` token is a placeholder that appears verbatim inside
/// `command`; [`crate::command::CommandBuilder`] resolves it against `folder`
/// when a reproduction command is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredTest {
    /// Display name of the test.
    pub name: String,

    /// Name of the test group (definition) the test belongs to.
    pub group: String,

    /// Reproduction command as captured from the validation script.
    pub command: String,

    /// Folder containing the launcher artifacts.
    #[serde(default)]
    pub folder: PathBuf,

    /// Root-directory token used inside `command`.
    #[serde(default)]
    pub root_dir: String,

    /// Path of the validation script the command was captured from.
    #[serde(default)]
    pub script_path: PathBuf,

    #[serde(default)]
    pub scenario: String,

    #[serde(default)]
    pub input_file: String,

    #[serde(default)]
    pub output_file: String,

    /// Set while an external debug session is attached to this test.
    #[serde(default)]
    pub debug_session: bool,
}

impl DiscoveredTest {
    /// Creates a test with only a name, group and command.
    ///
    /// This is the shape produced by the delegated strategy, which knows
    /// nothing about folders or scripts.
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<String>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    pub fn with_script_path(mut self, script_path: impl Into<PathBuf>) -> Self {
        self.script_path = script_path.into();
        self
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = scenario.into();
        self
    }

    pub fn with_input_file(mut self, input_file: impl Into<String>) -> Self {
        self.input_file = input_file.into();
        self
    }

    pub fn with_output_file(mut self, output_file: impl Into<String>) -> Self {
        self.output_file = output_file.into();
        self
    }

    /// Marks or unmarks the test as being debugged.
    pub fn set_debug_session(&mut self, active: bool) {
        self.debug_session = active;
    }

    pub fn is_debug_session(&self) -> bool {
        self.debug_session
    }
}

/// A structured error recorded during a discovery pass.
///
/// The underlying cause is rendered to text when the error is recorded so
/// that results stay cloneable and serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl CollectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Attaches an underlying cause, including its full source chain.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        self.cause = Some(format!("{:#}", cause.into()));
        self
    }
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => f.write_str(&self.message),
        }
    }
}

/// Output of one discovery pass.
///
/// Data and errors are independent: a pass can yield both, and a pass with
/// no tests but some errors is a perfectly valid outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub tests: Vec<DiscoveredTest>,

    #[serde(default)]
    pub errors: Vec<CollectionError>,
}

impl CollectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn push_error(&mut self, error: CollectionError) {
        self.errors.push(error);
    }

    /// Appends another result's tests and errors, preserving order.
    pub fn merge(&mut self, other: CollectionResult) {
        self.tests.extend(other.tests);
        self.errors.extend(other.errors);
    }

    /// Finds a test by name, optionally restricted to a group.
    pub fn find(&self, name: &str, group: Option<&str>) -> Option<&DiscoveredTest> {
        self.tests
            .iter()
            .find(|t| t.name == name && group.is_none_or(|g| t.group == g))
    }
}

/// Kind of a catalogue test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Equality,
    Fail,
    /// Modeled, but never produced by the catalogue parser.
    Success,
}

impl TestKind {
    /// Name of the catalogue section holding tests of this kind.
    pub fn section_tag(&self) -> &'static str {
        match self {
            TestKind::Equality => "EQUALITYTESTS",
            TestKind::Fail => "FAILTESTS",
            TestKind::Success => "SUCCESSTESTS",
        }
    }

    /// Name of a single test element inside the section.
    pub fn element_tag(&self) -> &'static str {
        let section = self.section_tag();
        &section[..section.len() - 1]
    }
}

/// One test parsed out of a test-suite catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuiteConfiguration {
    pub kind: TestKind,
    pub name: String,
    pub ini_file: String,
    pub source_file: String,
    pub out_file: String,
    pub log_file: String,

    /// Extra command-line flags (flag name without dash → value).
    pub additional_parameters: BTreeMap<String, String>,
}

impl TestSuiteConfiguration {
    pub fn new(name: impl Into<String>, kind: TestKind) -> Self {
        Self {
            kind,
            name: name.into(),
            ini_file: String::new(),
            source_file: String::new(),
            out_file: String::new(),
            log_file: String::new(),
            additional_parameters: BTreeMap::new(),
        }
    }

    fn flag_pairs(&self) -> Vec<(String, &str)> {
        let mut pairs = Vec::new();
        let fixed = [
            ("i", &self.source_file),
            ("o", &self.out_file),
            ("g", &self.log_file),
            ("ini", &self.ini_file),
        ];
        for (flag, value) in fixed {
            if !value.trim().is_empty() {
                pairs.push((format!("-{flag}"), value.as_str()));
            }
        }
        for (flag, value) in &self.additional_parameters {
            pairs.push((format!("-{flag}"), value.as_str()));
        }
        pairs
    }

    /// Arguments for the validation script, one element per argv entry.
    pub fn script_arguments(&self) -> Vec<String> {
        self.flag_pairs()
            .into_iter()
            .flat_map(|(flag, value)| [flag, value.to_string()])
            .collect()
    }

    /// Arguments for the validation script as a single string with every
    /// value double-quoted, e.g. `-i "in.txt" -o "out.txt" -scenario "s1"`.
    pub fn script_argument_string(&self) -> String {
        self.flag_pairs()
            .into_iter()
            .map(|(flag, value)| format!("{flag} \"{value}\""))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Phase of a discovery pass, advertised with every progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionPhase {
    Idle,
    /// Counters count launcher files.
    Scanning,
    /// Counters count tests within the current launcher file.
    PerTest,
    Done,
}

/// Progress of a discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingProgress {
    pub phase: CollectionPhase,
    pub current: usize,
    pub max: usize,
}

impl LoadingProgress {
    pub fn new(phase: CollectionPhase, current: usize, max: usize) -> Self {
        Self {
            phase,
            current,
            max,
        }
    }
}
