//! Console output and persistence of collection results.
//!
//! A pass is saved as pretty-printed JSON so that `list`, `command` and
//! `debug-copy` can work on it later without collecting again.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::model::{CollectionPhase, CollectionResult, DiscoveredTest, LoadingProgress};
use crate::strategy::ProgressCallback;

/// Writes `result` to `path` as JSON, creating parent directories.
pub fn save_result(result: &CollectionResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(result).context("Failed to serialize results")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write results file: {}", path.display()))?;
    Ok(())
}

/// Reads a result previously written by [`save_result`].
pub fn load_result(path: &Path) -> Result<CollectionResult> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file: {}", path.display()))?;
    let result = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse results file: {}", path.display()))?;
    Ok(result)
}

/// Prints test and error counts, followed by every error and its cause.
pub fn print_summary(result: &CollectionResult) {
    println!();
    println!("Collection Results:");
    println!("  Tests:  {}", console::style(result.tests.len()).green());
    println!("  Errors: {}", console::style(result.errors.len()).red());

    if !result.errors.is_empty() {
        println!();
        for error in &result.errors {
            println!("  {} {}", console::style("ERR").red().bold(), error.message);
            if let Some(cause) = &error.cause {
                println!("    {}", console::style(cause).dim());
            }
        }
    }

    println!();
    if result.tests.is_empty() && result.has_errors() {
        println!("{}", console::style("No tests were collected.").red().bold());
    } else if result.has_errors() {
        println!(
            "{}",
            console::style("Some launchers could not be collected.")
                .yellow()
                .bold()
        );
    } else {
        println!("{}", console::style("Collection complete.").green().bold());
    }
}

/// Prints one line per test as `group/name`, with the command underneath
/// when `verbose` is set.
pub fn print_tests<'a>(tests: impl IntoIterator<Item = &'a DiscoveredTest>, verbose: bool) {
    for test in tests {
        println!("  {}/{}", console::style(&test.group).cyan(), test.name);
        if verbose {
            if test.command.is_empty() {
                println!("    {}", console::style("(no command)").dim());
            } else {
                println!("    {}", console::style(&test.command).dim());
            }
        }
    }
}

fn phase_label(phase: CollectionPhase) -> &'static str {
    match phase {
        CollectionPhase::Idle => "starting",
        CollectionPhase::Scanning => "scanning launchers",
        CollectionPhase::PerTest => "running validation scripts",
        CollectionPhase::Done => "done",
    }
}

/// Terminal progress bar fed by a strategy's progress callback.
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// A hidden display, for non-interactive output.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Callback to hand to a strategy.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |progress: &LoadingProgress| {
            bar.set_length(progress.max as u64);
            bar.set_position(progress.current as u64);
            bar.set_message(phase_label(progress.phase));
        })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CollectionError;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_preserve_errors_and_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/results.json");

        let mut result = CollectionResult::new();
        result.tests.push(
            DiscoveredTest::new("Import01", "Import", "se.exe -i a.txt")
                .with_folder("/work/import")
                .with_root_dir(r"..\..")
                .with_scenario("full"),
        );
        result.push_error(
            CollectionError::new("Failed to parse definition file Group.xml")
                .with_cause(anyhow::anyhow!("unexpected end of file")),
        );

        save_result(&result, &path).unwrap();
        let loaded = load_result(&path).unwrap();

        assert_eq!(loaded, result);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let err = load_result(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_progress_callback_updates_bar() {
        let display = ProgressDisplay::hidden();
        let callback = display.callback();

        callback(&LoadingProgress::new(CollectionPhase::Scanning, 2, 5));
        assert_eq!(display.bar.length(), Some(5));
        assert_eq!(display.bar.position(), 2);
        display.finish();
    }
}
