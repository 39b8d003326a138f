//! Collection strategies.
//!
//! A strategy performs one discovery pass and returns a
//! [`CollectionResult`]. Two strategies ship with the crate:
//!
//! | Strategy | Module | Source of truth |
//! |----------|--------|-----------------|
//! | [`InProcessStrategy`] | [`in_process`] | launchers, XML files and per-test script runs |
//! | [`DelegatedStrategy`] | [`delegated`] | text report of an external orchestrator script |
//!
//! ```text
//!   CollectionCoordinator
//!            │ collect(interpreter, cancel)
//!            ▼
//!   ┌──────────────────────┐      progress callback
//!   │ dyn CollectionStrategy├────────────────────────► LoadingProgress
//!   └──────────┬───────────┘
//!              │
//!              ▼
//!   CollectionResult { tests, errors }
//! ```
//!
//! # Errors and cancellation
//!
//! Problems with an individual launcher file or script end up in
//! [`CollectionResult::errors`] and never abort the pass. Only cancellation
//! and an unusable search root fail a pass with a [`CollectError`].
//! Cancellation is checked each time progress is reported.

pub mod delegated;
pub mod in_process;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use walkdir::WalkDir;

use crate::model::{CollectionPhase, CollectionResult, LoadingProgress};

pub use delegated::DelegatedStrategy;
pub use in_process::InProcessStrategy;

/// Callback receiving progress updates during a pass.
pub type ProgressCallback = Arc<dyn Fn(&LoadingProgress) + Send + Sync>;

pub type CollectResult<T> = Result<T, CollectError>;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The pass was cancelled through its cancellation token.
    #[error("Collection was cancelled")]
    Cancelled,

    /// The search root does not exist or is not a directory.
    #[error("Search root is not a directory: {0}")]
    InvalidRoot(PathBuf),

    /// A file name pattern could not be compiled.
    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// One way of discovering regression tests.
#[async_trait]
pub trait CollectionStrategy: Send + Sync {
    /// Runs a discovery pass using `interpreter` to execute scripts.
    async fn collect(
        &self,
        interpreter: &str,
        cancel: &CancellationToken,
    ) -> CollectResult<CollectionResult>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Reports progress and checks for cancellation.
#[derive(Clone, Default)]
pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    /// Publishes a progress update, failing if `cancel` has fired.
    pub(crate) fn report(
        &self,
        cancel: &CancellationToken,
        phase: CollectionPhase,
        current: usize,
        max: usize,
    ) -> CollectResult<()> {
        if cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }
        if let Some(callback) = &self.callback {
            callback(&LoadingProgress::new(phase, current, max));
        }
        Ok(())
    }
}

/// Compiles a case-insensitive file name pattern such as `RegTest*.py`.
pub(crate) fn file_pattern(pattern: &str) -> CollectResult<GlobMatcher> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| CollectError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Files below `root` (recursively) whose file name matches `matcher`,
/// sorted by path.
pub(crate) fn find_files(root: &Path, matcher: &GlobMatcher) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry below {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| matcher.is_match(entry.file_name()))
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}
