//! Child process execution with line-wise output capture.
//!
//! [`ProcessRunner`] spawns one interpreter invocation, drains stdout and
//! stderr concurrently as line streams, forwards each line to optional
//! callbacks and returns once the child has exited. Nothing is retried.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

/// Callback invoked with every captured output line.
pub type LineCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub type ProcessResult<T> = Result<T, ProcessError>;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while waiting for '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout lines concatenated without separators.
    pub fn stdout_concatenated(&self) -> String {
        self.stdout_lines.concat()
    }

    /// Stdout lines joined with `\n`.
    pub fn stdout_text(&self) -> String {
        self.stdout_lines.join("\n")
    }
}

enum Line {
    Stdout(String),
    Stderr(String),
}

/// Runs a program with arguments and captures its output.
#[derive(Clone, Default)]
pub struct ProcessRunner {
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    on_stdout: Option<LineCallback>,
    on_stderr: Option<LineCallback>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kills the child and fails with [`ProcessError::Timeout`] once
    /// `timeout` has elapsed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stdout_callback(mut self, callback: LineCallback) -> Self {
        self.on_stdout = Some(callback);
        self
    }

    pub fn with_stderr_callback(mut self, callback: LineCallback) -> Self {
        self.on_stderr = Some(callback);
        self
    }

    /// Runs `program` with `args` and waits for it to exit.
    ///
    /// A non-zero exit code is not an error; inspect
    /// [`ProcessOutput::exit_code`].
    pub async fn run<S: AsRef<str>>(&self, program: &str, args: &[S]) -> ProcessResult<ProcessOutput> {
        let start = Instant::now();

        let mut command = tokio::process::Command::new(program);
        command.args(args.iter().map(AsRef::as_ref));
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.kill_on_drop(true);

        debug!(
            "Running {} {}",
            program,
            shell_words::join(args.iter().map(AsRef::as_ref))
        );

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let io_error = |source: std::io::Error| ProcessError::Io {
            program: program.to_string(),
            source,
        };
        let stdout = child.stdout.take().ok_or_else(|| {
            io_error(std::io::Error::other("stdout was not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            io_error(std::io::Error::other("stderr was not captured"))
        })?;

        let stdout_stream = LinesStream::new(BufReader::new(stdout).lines())
            .map(|line: Result<String, std::io::Error>| Line::Stdout(line.unwrap_or_default()));
        let stderr_stream = LinesStream::new(BufReader::new(stderr).lines())
            .map(|line: Result<String, std::io::Error>| Line::Stderr(line.unwrap_or_default()));
        let mut combined = stream::select(stdout_stream, stderr_stream);

        let mut output = ProcessOutput::default();
        let drain_and_wait = async {
            while let Some(line) = combined.next().await {
                match line {
                    Line::Stdout(line) => {
                        if let Some(callback) = &self.on_stdout {
                            callback(&line);
                        }
                        output.stdout_lines.push(line);
                    }
                    Line::Stderr(line) => {
                        if let Some(callback) = &self.on_stderr {
                            callback(&line);
                        }
                        output.stderr_lines.push(line);
                    }
                }
            }
            child.wait().await
        };

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, drain_and_wait).await {
                Ok(status) => status,
                Err(_) => {
                    warn!("'{}' timed out after {}s, killing it", program, timeout.as_secs());
                    // The child is dropped with kill_on_drop set.
                    return Err(ProcessError::Timeout {
                        program: program.to_string(),
                        timeout,
                    });
                }
            },
            None => drain_and_wait.await,
        }
        .map_err(io_error)?;

        output.exit_code = status.code().unwrap_or(-1);
        output.duration = start.elapsed();

        if !output.stderr_lines.is_empty() {
            debug!("{} wrote {} stderr lines", program, output.stderr_lines.len());
        }

        Ok(output)
    }
}
