//! Streamed child-process execution.
//!
//! Every component that shells out goes through [`Cmd`]. Child stderr is
//! merged into the same line stream as stdout and each line is forwarded to
//! the deployment's log stream as it arrives, so the log is live rather
//! than buffered to completion. Stream-read errors end the forwarding loop
//! silently; only a non-zero exit is surfaced as an error.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use cutover_core::{ExecError, LogStream};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Run to completion, forwarding every output line (stdout and stderr
    /// interleaved) to `log`.
    pub async fn stream(self, log: &LogStream) -> Result<(), ExecError> {
        debug!(program = %self.program, args = ?self.args, "Running command");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Both pipes get their own reader so a full stderr buffer can never
        // stall a build that is chatty on stdout.
        let out_task = stdout.map(|pipe| tokio::spawn(forward_lines(pipe, log.clone())));
        let err_task = stderr.map(|pipe| tokio::spawn(forward_lines(pipe, log.clone())));

        if let Some(task) = out_task {
            let _ = task.await;
        }
        if let Some(task) = err_task {
            let _ = task.await;
        }

        let status = child.wait().await.map_err(|source| ExecError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            match status.code() {
                Some(code) => Err(ExecError::NonZeroExit {
                    program: self.program,
                    code,
                }),
                None => Err(ExecError::Terminated {
                    program: self.program,
                }),
            }
        }
    }

    /// Run to completion and return trimmed stdout. For short outputs such
    /// as `git rev-parse`; build-sized output belongs in [`Cmd::stream`].
    pub async fn capture(self) -> Result<String, ExecError> {
        debug!(program = %self.program, args = ?self.args, "Capturing command");

        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| ExecError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            match output.status.code() {
                Some(code) => Err(ExecError::NonZeroExit {
                    program: self.program,
                    code,
                }),
                None => Err(ExecError::Terminated {
                    program: self.program,
                }),
            }
        }
    }
}

async fn forward_lines(pipe: impl AsyncRead + Unpin + Send + 'static, log: LogStream) {
    let mut lines = BufReader::new(pipe).lines();
    // Read errors end the stream; they never fail the command itself.
    while let Ok(Some(line)) = lines.next_line().await {
        log.append(line);
    }
}
