// src/exec/command.rs

//! Shell-command task bodies.

use std::process::Stdio;

use anyhow::{Context, anyhow};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskGraphError};
use crate::task::{TaskContext, TaskWork};

/// Result recorded on a task whose command exited successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
}

/// Task body that runs `cmd` through the platform shell.
///
/// The body blocks its executor thread on `handle` until the process exits,
/// so an executor's concurrency bound also bounds running processes. It must
/// not run inside an async context (use [`crate::exec::TokioExecutor`], not
/// [`crate::exec::InlineExecutor`] from within a runtime). A non-zero exit
/// fails the task; cancelling the task kills the process.
#[derive(Debug, Clone)]
pub struct CommandWork {
    cmd: String,
    handle: Handle,
}

impl CommandWork {
    pub fn new(cmd: impl Into<String>, handle: Handle) -> Self {
        Self {
            cmd: cmd.into(),
            handle,
        }
    }

    /// Use the tokio runtime the caller is running on.
    pub fn on_current_runtime(cmd: impl Into<String>) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| TaskGraphError::NoRuntime(e.to_string()))?;
        Ok(Self::new(cmd, handle))
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl TaskWork for CommandWork {
    fn run(&self, ctx: TaskContext) {
        match self.handle.block_on(run_command(&self.cmd, &ctx)) {
            Ok(Some(0)) => {
                ctx.finish_with_result(CommandOutput { exit_code: 0 });
            }
            Ok(Some(code)) => {
                ctx.fail_with_error(anyhow!("command `{}` exited with code {code}", self.cmd));
            }
            // Cancelled: the task is no longer Executing, nothing to report.
            Ok(None) => {}
            Err(err) => {
                ctx.fail_with_error(err);
            }
        }
    }
}

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Returns the exit code, or `None` if the task was cancelled first.
async fn run_command(cmd: &str, ctx: &TaskContext) -> anyhow::Result<Option<i32>> {
    info!(task = %ctx.name(), execution = ctx.execution(), cmd = %cmd, "starting task process");

    let mut command = shell_command(cmd);
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", ctx.name()))?;

    if let Some(stdout) = child.stdout.take() {
        forward_lines(ctx.name().to_string(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(ctx.name().to_string(), "stderr", stderr);
    }

    tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for process of task '{}'", ctx.name()))?;
            let code = status.code().unwrap_or(-1);
            info!(
                task = %ctx.name(),
                exit_code = code,
                success = status.success(),
                "task process exited"
            );
            Ok(Some(code))
        }
        _ = ctx.cancelled() => {
            info!(task = %ctx.name(), "task cancelled; killing process");
            if let Err(e) = child.kill().await {
                warn!(task = %ctx.name(), error = %e, "failed to kill child process on cancellation");
            }
            Ok(None)
        }
    }
}

/// Drain a child pipe so it never fills, logging each line at debug.
fn forward_lines<R>(task: String, stream: &'static str, pipe: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task = %task, stream, "{}", line);
        }
    });
}
