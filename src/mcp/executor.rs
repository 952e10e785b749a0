/*!
executor.rs - run a translated invocation and capture its output.

Two strategies:
  - Subprocess: re-execute this binary as `<exe> <path..> <argv..>` with
    stdout and stderr sharing one pipe, so the captured text keeps the
    interleaving the user would see in a terminal. The child is killed when
    the call is cancelled or the optional timeout elapses.
  - InProcess: parse argv with the leaf's generated clap parser and call its
    action on a blocking thread with an in-memory writer.

Either way the caller gets an `ExecutionResult` with the full captured text;
failures never discard output.
*/

use std::io::Read;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::tree::cli::{LeafParse, parse_leaf};
use crate::tree::{CommandNode, TreeError, effective_flags};

/// How long to wait for the pipe to drain after killing a child.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Captured output of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: String,
    pub failed: bool,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            failed: false,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            failed: true,
        }
    }

    fn append_line(&mut self, line: &str) {
        if !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
        self.output.push_str(line);
        self.output.push('\n');
    }
}

/* ---- Subprocess ---- */

/// Re-executes a program (normally the running binary) per call.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    program: PathBuf,
    timeout: Option<Duration>,
}

enum Finish {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

impl SubprocessExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Executor for the currently running binary.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn execute(
        &self,
        path: &[String],
        argv: &[String],
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let (reader, writer) = match std::io::pipe() {
            Ok(pair) => pair,
            Err(e) => return ExecutionResult::failure(format!("failed to create output pipe: {e}")),
        };
        let writer_err = match writer.try_clone() {
            Ok(w) => w,
            Err(e) => return ExecutionResult::failure(format!("failed to create output pipe: {e}")),
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(path)
            .args(argv)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(writer_err)
            .kill_on_drop(true);

        tracing::debug!(
            program = %self.program.display(),
            command = %shell_words::join(path.iter().chain(argv.iter())),
            "spawning command"
        );
        let started = Instant::now();
        let spawned = cmd.spawn();
        // The command still owns the parent's copies of the write end.
        drop(cmd);

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::failure(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ));
            }
        };

        let collector = tokio::task::spawn_blocking(move || {
            let mut reader = reader;
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            buf
        });

        let finish = tokio::select! {
            status = child.wait() => Finish::Exited(status),
            _ = cancel.cancelled() => Finish::Cancelled,
            _ = deadline(self.timeout) => Finish::TimedOut(self.timeout.unwrap_or_default()),
        };

        let exited = matches!(finish, Finish::Exited(_));
        if !exited {
            let _ = child.kill().await;
        }

        let bytes = if exited {
            collector.await.unwrap_or_default()
        } else {
            tokio::time::timeout(DRAIN_GRACE, collector)
                .await
                .ok()
                .and_then(Result::ok)
                .unwrap_or_default()
        };
        let output = String::from_utf8_lossy(&bytes).into_owned();

        let result = match finish {
            Finish::Exited(Ok(status)) if status.success() => ExecutionResult::success(output),
            Finish::Exited(Ok(status)) => {
                tracing::debug!(%status, "command failed");
                ExecutionResult::failure(output)
            }
            Finish::Exited(Err(e)) => {
                let mut r = ExecutionResult::failure(output);
                r.append_line(&format!("failed to wait for command: {e}"));
                r
            }
            Finish::Cancelled => {
                let mut r = ExecutionResult::failure(output);
                r.append_line("command cancelled");
                r
            }
            Finish::TimedOut(limit) => {
                let mut r = ExecutionResult::failure(output);
                r.append_line(&format!("command timed out after {limit:?}"));
                r
            }
        };
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            failed = result.failed,
            bytes = result.output.len(),
            "command finished"
        );
        result
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}

/* ---- In-process ---- */

/// Dispatches straight to node actions of a shared tree.
#[derive(Debug, Clone)]
pub struct InProcessExecutor {
    root: Arc<CommandNode>,
}

impl InProcessExecutor {
    pub fn new(root: Arc<CommandNode>) -> Self {
        Self { root }
    }

    pub async fn execute(
        &self,
        path: &[String],
        argv: &[String],
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let root = Arc::clone(&self.root);
        let path = path.to_vec();
        let argv = argv.to_vec();
        let task = tokio::task::spawn_blocking(move || run_in_process(&root, &path, &argv));
        tokio::select! {
            joined = task => joined.unwrap_or_else(|e| ExecutionResult::failure(format!("command panicked: {e}"))),
            _ = cancel.cancelled() => ExecutionResult::failure("command cancelled\n"),
        }
    }
}

/// Synchronous body of the in-process strategy.
pub fn run_in_process(root: &CommandNode, path: &[String], argv: &[String]) -> ExecutionResult {
    let Some((node, inherited)) = root.resolve(path) else {
        return ExecutionResult::failure(TreeError::UnknownCommand(path.join(" ")).to_string());
    };
    let Some(action) = node.action.as_ref() else {
        return ExecutionResult::failure(TreeError::NotRunnable(path.join(" ")).to_string());
    };
    let flags = effective_flags(node, &inherited);

    match parse_leaf(node, &flags, path, argv) {
        LeafParse::Display(text) => ExecutionResult::success(text),
        LeafParse::Invalid(text) => ExecutionResult::failure(text),
        LeafParse::Parsed(parsed) => {
            let mut buf: Vec<u8> = Vec::new();
            let outcome = action(&parsed, &mut buf);
            let output = String::from_utf8_lossy(&buf).into_owned();
            match outcome {
                Ok(()) => ExecutionResult::success(output),
                Err(e) => {
                    let mut r = ExecutionResult::failure(output);
                    r.append_line(&format!("Error: {e:#}"));
                    r
                }
            }
        }
    }
}

/* ---- Strategy selection ---- */

/// The executor a server is configured with.
#[derive(Debug, Clone)]
pub enum CommandExecutor {
    Subprocess(SubprocessExecutor),
    InProcess(InProcessExecutor),
}

impl CommandExecutor {
    pub async fn execute(
        &self,
        path: &[String],
        argv: &[String],
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        match self {
            CommandExecutor::Subprocess(e) => e.execute(path, argv, cancel).await,
            CommandExecutor::InProcess(e) => e.execute(path, argv, cancel).await,
        }
    }
}
