//! Delegated collection: an external orchestrator script does the discovery
//! and this strategy only structures its text report.
//!
//! The report is taken from the script's stdout, or from the sibling
//! `<stem>Results.txt` file the script writes when
//! [`DelegatedStrategy::with_results_file`] is enabled. See
//! [`crate::parser::report`] for the report format.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{CollectResult, CollectionStrategy, ProgressCallback, ProgressReporter};
use crate::model::{CollectionError, CollectionPhase, CollectionResult};
use crate::parser::report::{ReportMarkers, ReportParser};
use crate::process::ProcessRunner;
use crate::script::sibling_with_suffix;

/// Suffix of the results file written next to the orchestrator script.
pub const RESULTS_FILE_SUFFIX: &str = "Results";

/// Runs an orchestrator script and parses its report.
#[derive(Clone)]
pub struct DelegatedStrategy {
    script: PathBuf,
    parser: ReportParser,
    read_results_file: bool,
    timeout: Option<Duration>,
    progress: ProgressReporter,
}

impl DelegatedStrategy {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            parser: ReportParser::default(),
            read_results_file: false,
            timeout: None,
            progress: ProgressReporter::default(),
        }
    }

    pub fn with_markers(mut self, markers: ReportMarkers) -> Self {
        self.parser = ReportParser::new(markers);
        self
    }

    /// Reads the report from `<stem>Results.txt` instead of stdout.
    pub fn with_results_file(mut self, enabled: bool) -> Self {
        self.read_results_file = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = ProgressReporter::new(Some(callback));
        self
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Path of the results file for this strategy's script.
    pub fn results_file(&self) -> PathBuf {
        sibling_with_suffix(&self.script, RESULTS_FILE_SUFFIX).with_extension("txt")
    }
}

#[async_trait]
impl CollectionStrategy for DelegatedStrategy {
    async fn collect(
        &self,
        interpreter: &str,
        cancel: &CancellationToken,
    ) -> CollectResult<CollectionResult> {
        self.progress.report(cancel, CollectionPhase::Idle, 0, 0)?;
        self.progress
            .report(cancel, CollectionPhase::Scanning, 0, 1)?;

        let mut runner = ProcessRunner::new().with_timeout(self.timeout);
        if let Some(dir) = self.script.parent().filter(|d| !d.as_os_str().is_empty()) {
            runner = runner.with_working_dir(dir);
        }

        let script_arg = self.script.to_string_lossy().into_owned();
        let output = match runner.run(interpreter, &[script_arg]).await {
            Ok(output) => output,
            Err(e) => {
                let mut result = CollectionResult::new();
                result.push_error(
                    CollectionError::new(format!(
                        "Failed to run orchestrator script {}",
                        self.script.display()
                    ))
                    .with_cause(e),
                );
                self.progress.report(cancel, CollectionPhase::Done, 1, 1)?;
                return Ok(result);
            }
        };
        debug!(
            "Orchestrator exited with {} after {:?}",
            output.exit_code, output.duration
        );

        self.progress
            .report(cancel, CollectionPhase::Scanning, 1, 1)?;

        let report = if self.read_results_file {
            let path = self.results_file();
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) => {
                    let mut result = CollectionResult::new();
                    result.push_error(
                        CollectionError::new(format!(
                            "Failed to read results file {}",
                            path.display()
                        ))
                        .with_cause(e),
                    );
                    self.progress.report(cancel, CollectionPhase::Done, 1, 1)?;
                    return Ok(result);
                }
            }
        } else {
            output.stdout_text()
        };

        let result = self.parser.parse(&report);
        info!(
            "Parsed {} tests from {}",
            result.tests.len(),
            self.script.display()
        );

        self.progress.report(cancel, CollectionPhase::Done, 1, 1)?;
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "delegated"
    }
}
