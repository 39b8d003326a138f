//! In-process collection: parse the launcher artifacts directly and run the
//! validation script once per catalogue entry.
//!
//! For every launcher below the search root:
//!
//! ```text
//! RegressionTestX.bat ─► BatchArguments ─► definition XML ─► catalogue XML
//!                                                                   │
//!                     RegTestX.py ─► RegTestX_copy.py ◄─────────────┘
//!                                          │  one run per catalogue entry
//!                                          ▼
//!                         ['..\\bin\\se.exe', '-i', ...]  ─► DiscoveredTest
//! ```
//!
//! The working copy prints the command it would launch instead of launching
//! it, so a run costs one interpreter start and no test execution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use globset::GlobMatcher;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    CollectError, CollectResult, CollectionStrategy, ProgressCallback, ProgressReporter,
    file_pattern, find_files,
};
use crate::command::format_output_array;
use crate::model::{
    BatchArguments, CollectionError, CollectionPhase, CollectionResult, DiscoveredTest,
};
use crate::parser::batch::{ArgumentLineParser, DEFAULT_QUALIFIER, missing_arguments};
use crate::parser::catalog::CatalogParser;
use crate::parser::definition::DefinitionParser;
use crate::paths::PathStyle;
use crate::process::ProcessRunner;
use crate::script::{DEBUG_COPY_SUFFIX, ScriptTransform, WORKING_COPY_SUFFIX};
use crate::text::argument_value;

/// Default launcher file pattern.
pub const DEFAULT_BATCH_PATTERN: &str = "RegressionTest*.bat";

/// Default validation script pattern.
pub const DEFAULT_SCRIPT_PATTERN: &str = "RegTest*.py";

/// Discovers tests by parsing launcher artifacts below a search root.
#[derive(Clone)]
pub struct InProcessStrategy {
    root: PathBuf,
    batch_pattern: String,
    script_pattern: String,
    qualifier: String,
    transform: ScriptTransform,
    style: PathStyle,
    timeout: Option<Duration>,
    progress: ProgressReporter,
}

impl InProcessStrategy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            batch_pattern: DEFAULT_BATCH_PATTERN.to_string(),
            script_pattern: DEFAULT_SCRIPT_PATTERN.to_string(),
            qualifier: DEFAULT_QUALIFIER.to_string(),
            transform: ScriptTransform::default(),
            style: PathStyle::native(),
            timeout: None,
            progress: ProgressReporter::default(),
        }
    }

    pub fn with_batch_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.batch_pattern = pattern.into();
        self
    }

    pub fn with_script_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.script_pattern = pattern.into();
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    pub fn with_transform(mut self, transform: ScriptTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_path_style(mut self, style: PathStyle) -> Self {
        self.style = style;
        self
    }

    /// Per-process timeout. An expired run counts as a process failure.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = ProgressReporter::new(Some(callback));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn batch_pattern(&self) -> &str {
        &self.batch_pattern
    }

    pub fn script_pattern(&self) -> &str {
        &self.script_pattern
    }

    /// Collects the tests of one launcher file.
    ///
    /// Every failure is recorded in the returned result; only cancellation
    /// is returned as an error.
    async fn collect_file(
        &self,
        batch_file: &Path,
        interpreter: &str,
        script_matcher: &GlobMatcher,
        cancel: &CancellationToken,
    ) -> CollectResult<CollectionResult> {
        let mut result = CollectionResult::new();
        let dir = batch_file.parent().unwrap_or(Path::new(".")).to_path_buf();

        let text = match tokio::fs::read_to_string(batch_file).await {
            Ok(text) => text,
            Err(e) => {
                result.push_error(
                    CollectionError::new(format!(
                        "Failed to read launcher file {}",
                        batch_file.display()
                    ))
                    .with_cause(e),
                );
                return Ok(result);
            }
        };

        let args = ArgumentLineParser::new(&self.qualifier).parse(&text);
        let missing = missing_arguments(&args);
        if !missing.is_empty() {
            result.push_error(CollectionError::new(format!(
                "Missing launcher arguments {} in {}",
                missing.join(", "),
                batch_file.display()
            )));
            return Ok(result);
        }
        let root_dir = argument(&args, "rootDir");

        // Definition
        let definition_path = dir.join(argument(&args, "def"));
        let definition = match tokio::fs::read_to_string(&definition_path).await {
            Ok(xml) => DefinitionParser::new()
                .parse(&xml)
                .map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e)),
        };
        let mut definition = match definition {
            Ok(definition) => definition,
            Err(e) => {
                result.push_error(
                    CollectionError::new(format!(
                        "Failed to parse definition file {}",
                        definition_path.display()
                    ))
                    .with_cause(e),
                );
                return Ok(result);
            }
        };
        definition.resolve_server(argument(&args, "exeTarget"), root_dir);

        // Catalogue
        let catalog_path = dir.join(argument(&args, "useConfig"));
        let configs = match tokio::fs::read_to_string(&catalog_path).await {
            Ok(xml) => CatalogParser::new(self.style)
                .parse(&xml, root_dir)
                .map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e)),
        };
        let configs = match configs {
            Ok(configs) => configs,
            Err(e) => {
                result.push_error(
                    CollectionError::new(format!(
                        "Failed to parse test catalogue {}",
                        catalog_path.display()
                    ))
                    .with_cause(e),
                );
                return Ok(result);
            }
        };

        // Validation script, anywhere below the launcher's folder
        let Some(script) = find_files(&dir, script_matcher)
            .into_iter()
            .find(|path| !is_generated_copy(path))
        else {
            result.push_error(CollectionError::new(format!(
                "No validation script matching '{}' found in {}",
                self.script_pattern,
                dir.display()
            )));
            return Ok(result);
        };

        let working_copy = match self.transform.create_transformed_copy(&script).await {
            Ok(copy) => copy,
            Err(e) => {
                result.push_error(
                    CollectionError::new(format!(
                        "Failed to create working copy of {}",
                        script.display()
                    ))
                    .with_cause(e),
                );
                return Ok(result);
            }
        };

        let root_token = root_dir.replace('/', "\\").replace("\\\\", "\\");
        let runner = ProcessRunner::new()
            .with_working_dir(&dir)
            .with_timeout(self.timeout);
        let working_copy_arg = working_copy.to_string_lossy().into_owned();

        debug!(
            "Collecting {} tests of group '{}' with {}",
            configs.len(),
            definition.name,
            script.display()
        );

        let total = configs.len();
        self.progress
            .report(cancel, CollectionPhase::PerTest, 0, total)?;

        for (index, config) in configs.iter().enumerate() {
            let mut argv = vec![working_copy_arg.clone()];
            argv.extend(config.script_arguments());
            argv.push("-server".to_string());
            argv.push(definition.server_default.clone());

            let output = match runner.run(interpreter, &argv).await {
                Ok(output) => output,
                Err(e) => {
                    // The working copy is left behind on this path.
                    warn!("Aborting {} after process failure", batch_file.display());
                    result.push_error(
                        CollectionError::new(format!(
                            "Failed to run working copy {}",
                            working_copy.display()
                        ))
                        .with_cause(e),
                    );
                    return Ok(result);
                }
            };

            let command = format_output_array(&output.stdout_concatenated());
            if command.is_empty() {
                debug!("Test '{}' printed no command", config.name);
            }

            result.tests.push(
                DiscoveredTest::new(&config.name, &definition.name, command)
                    .with_folder(&dir)
                    .with_root_dir(&root_token)
                    .with_script_path(&script)
                    .with_input_file(&config.source_file)
                    .with_output_file(&config.out_file)
                    .with_scenario(argument_value(
                        &config.script_argument_string(),
                        "scenario",
                    )),
            );

            self.progress
                .report(cancel, CollectionPhase::PerTest, index + 1, total)?;
        }

        if let Err(e) = tokio::fs::remove_file(&working_copy).await {
            warn!(
                "Failed to remove working copy {}: {}",
                working_copy.display(),
                e
            );
        }

        Ok(result)
    }
}

/// Working and debug copies match the script pattern too.
fn is_generated_copy(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy())
        .is_some_and(|stem| {
            stem.ends_with(WORKING_COPY_SUFFIX) || stem.ends_with(DEBUG_COPY_SUFFIX)
        })
}

fn argument<'a>(args: &'a BatchArguments, key: &str) -> &'a str {
    args.get(key).map(String::as_str).unwrap_or_default()
}

#[async_trait]
impl CollectionStrategy for InProcessStrategy {
    async fn collect(
        &self,
        interpreter: &str,
        cancel: &CancellationToken,
    ) -> CollectResult<CollectionResult> {
        if !self.root.is_dir() {
            return Err(CollectError::InvalidRoot(self.root.clone()));
        }
        let batch_matcher = file_pattern(&self.batch_pattern)?;
        let script_matcher = file_pattern(&self.script_pattern)?;

        self.progress.report(cancel, CollectionPhase::Idle, 0, 0)?;

        let files = find_files(&self.root, &batch_matcher);
        info!(
            "Found {} launcher files below {}",
            files.len(),
            self.root.display()
        );

        let total = files.len();
        self.progress
            .report(cancel, CollectionPhase::Scanning, 0, total)?;

        let mut result = CollectionResult::new();
        for (index, file) in files.iter().enumerate() {
            let file_result = self
                .collect_file(file, interpreter, &script_matcher, cancel)
                .await?;
            result.merge(file_result);

            self.progress
                .report(cancel, CollectionPhase::Scanning, index + 1, total)?;
        }

        info!(
            "Collected {} tests with {} errors",
            result.tests.len(),
            result.errors.len()
        );
        self.progress
            .report(cancel, CollectionPhase::Done, total, total)?;

        Ok(result)
    }

    fn name(&self) -> &'static str {
        "in_process"
    }
}
