//! Parser for the text report printed by an external orchestrator script.
//!
//! The report is line oriented. A group marker names the test group, a test
//! marker names a test, and the line following a test is expected to hold its
//! reproduction command:
//!
//! ```text
//! Running RegressionTestImport.bat
//! Test: Import01 - equality
//!     ..\bin\se.exe -i "in.txt" -o out.txt
//! Test: Import02 - fail
//! (skipped)
//! ```
//!
//! yields `(Import, Import01, ..\bin\se.exe -i "in.txt" -o out.txt)` and
//! `(Import, Import02, "")`. When the line after the test marker lacks the
//! command signature the test is kept with an empty command. A test marker on
//! the last line has no line after it and is dropped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{CollectionResult, DiscoveredTest};

/// Marker strings recognised in an orchestrator report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportMarkers {
    /// Precedes the group name (case-insensitive).
    pub group: String,

    /// Precedes the test name (case-insensitive).
    pub test: String,

    /// Substring identifying a command line.
    pub command: String,
}

impl Default for ReportMarkers {
    fn default() -> Self {
        Self {
            group: "RegressionTest".to_string(),
            test: "Test: ".to_string(),
            command: "se.exe".to_string(),
        }
    }
}

/// Turns orchestrator output into discovered tests.
#[derive(Debug, Clone, Default)]
pub struct ReportParser {
    markers: ReportMarkers,
}

impl ReportParser {
    pub fn new(markers: ReportMarkers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &ReportMarkers {
        &self.markers
    }

    /// Parses a full report. Never fails; unrecognised lines are ignored.
    pub fn parse(&self, text: &str) -> CollectionResult {
        let mut result = CollectionResult::new();
        let mut group = String::new();
        let mut pending: Option<String> = None;

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(name) = pending.take() {
                let command = if line.contains(&self.markers.command) {
                    line.trim()
                } else {
                    ""
                };
                result.tests.push(DiscoveredTest::new(name, &group, command));
            }

            if let Some(found) = after_marker(line, &self.markers.group) {
                group = until(found, ".").to_string();
                continue;
            }

            if let Some(found) = after_marker(line, &self.markers.test) {
                pending = Some(until(found, " -").to_string());
            }
        }

        if let Some(name) = pending {
            debug!("Dropping test '{}' with no line after it", name);
        }

        result
    }
}

/// Trimmed text following the first case-insensitive occurrence of `marker`.
fn after_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    if marker.is_empty() {
        return None;
    }
    let idx = line
        .to_ascii_lowercase()
        .find(&marker.to_ascii_lowercase())?;
    line.get(idx + marker.len()..).map(str::trim)
}

fn until<'a>(text: &'a str, delimiter: &str) -> &'a str {
    text.split(delimiter).next().unwrap_or_default()
}
