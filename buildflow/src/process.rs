//! External worker process launching.
//!
//! In external mode each task is handed to a separate worker process that
//! re-enters the same pipeline scoped to that one task. The runner pumps
//! the worker's output back through the task's observer and maps its exit
//! status to a task exit code.

use crate::cancellation::CancellationToken;
use crate::observer::TaskObserver;
use async_trait::async_trait;
use std::env;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Default file name of the worker binary.
pub const DEFAULT_WORKER: &str = "buildflow-proc";

/// Runs a program to completion, forwarding its output.
#[async_trait]
pub trait ProcessRunner: Send + Sync + Debug {
    /// Spawns the program, streams its output through the observer and
    /// returns its exit code. A process killed by a signal reports -1.
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        observer: &TaskObserver,
        cancel: &CancellationToken,
    ) -> io::Result<i32>;
}

/// The production process runner, backed by `tokio::process`.
///
/// stdout lines are forwarded as info events, stderr lines as warnings.
/// The cancellation token is polled while the child runs; on cancellation
/// the child is killed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Creates a new runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        observer: &TaskObserver,
        cancel: &CancellationToken,
    ) -> io::Result<i32> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // The work now lives in the child; tell the observer the engine is
        // only waiting.
        observer.idle();

        let mut stdout = child
            .stdout
            .take()
            .map(|s| BufReader::new(s).lines());
        let mut stderr = child
            .stderr
            .take()
            .map(|s| BufReader::new(s).lines());

        let mut stdout_open = stdout.is_some();
        let mut stderr_open = stderr.is_some();
        let mut poll = tokio::time::interval(Duration::from_millis(100));
        let mut kill_sent = false;

        while stdout_open || stderr_open {
            tokio::select! {
                line = next_line(&mut stdout), if stdout_open => match line? {
                    Some(text) => observer.info(&text),
                    None => stdout_open = false,
                },
                line = next_line(&mut stderr), if stderr_open => match line? {
                    Some(text) => observer.warning(&text),
                    None => stderr_open = false,
                },
                _ = poll.tick() => {
                    if cancel.is_cancelled() && !kill_sent {
                        observer.warning("cancellation requested, killing worker process");
                        child.start_kill()?;
                        kill_sent = true;
                    }
                }
            }
        }

        let status = child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }
}

async fn next_line(
    lines: &mut Option<tokio::io::Lines<BufReader<impl tokio::io::AsyncRead + Unpin>>>,
) -> io::Result<Option<String>> {
    match lines {
        Some(lines) => lines.next_line().await,
        None => Ok(None),
    }
}

/// The worker binary a task re-invocation launches, plus an optional host
/// runtime that must wrap it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReinvokeTarget {
    program: PathBuf,
    host: Option<PathBuf>,
}

impl ReinvokeTarget {
    /// Creates a target launching the given program directly.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            host: None,
        }
    }

    /// Wraps the program in a host runtime (`host program args...`).
    #[must_use]
    pub fn with_host(mut self, host: impl Into<PathBuf>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Locates the default worker binary.
    ///
    /// Looks next to the current executable first, then on PATH.
    pub fn locate() -> io::Result<Self> {
        Self::locate_named(DEFAULT_WORKER)
    }

    /// Locates a worker binary by file name.
    pub fn locate_named(name: &str) -> io::Result<Self> {
        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                let mut candidate = dir.join(name);
                if !candidate.exists() && cfg!(windows) {
                    candidate.set_extension("exe");
                }
                if candidate.exists() {
                    return Ok(Self::new(candidate));
                }
            }
        }

        which::which(name).map(Self::new).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("worker binary '{name}' not found: {e}"),
            )
        })
    }

    /// The worker program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Resolves the actual program and argument vector to launch.
    #[must_use]
    pub fn command_line(&self, args: &[String]) -> (PathBuf, Vec<String>) {
        match &self.host {
            Some(host) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(self.program.to_string_lossy().into_owned());
                full.extend_from_slice(args);
                (host.clone(), full)
            }
            None => (self.program.clone(), args.to_vec()),
        }
    }
}
