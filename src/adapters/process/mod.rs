//! Subprocess runner shared by every tool adapter.
//!
//! Output is captured in full; an optional timeout kills the child.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::domain::model::ToolOutput;

/// Why a tool could not produce an exit status
#[derive(Debug, Error)]
pub enum ToolRunError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

/// One external command invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            envs: Vec::new(),
            timeout: None,
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

    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Run to completion and capture output
    pub async fn run(&self) -> Result<ToolOutput, ToolRunError> {
        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(OsStr::new))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }

        debug!(program = %self.program, args = ?self.args, "Running external tool");
        let started = Instant::now();

        let child = command.spawn().map_err(|source| ToolRunError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ToolRunError::TimedOut {
                    program: self.program.clone(),
                    timeout: limit,
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|source| ToolRunError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        debug!(
            program = %self.program,
            status = ?output.status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "External tool finished"
        );

        Ok(ToolOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Look a program up on PATH (or accept an explicit path to an existing file)
pub fn is_program_available(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output_and_status() {
        let output = ToolCommand::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .run()
            .await
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_passes_env_and_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output = ToolCommand::new("sh")
            .args(["-c", "echo $SHORTCLIP_SESSION; pwd"])
            .env("SHORTCLIP_SESSION", "abc")
            .working_dir(dir.path())
            .run()
            .await
            .unwrap();

        assert!(output.success);
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("abc"));
        let pwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(
            pwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = ToolCommand::new("shortclip-definitely-missing-tool")
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ToolRunError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let err = ToolCommand::new("sleep")
            .arg("5")
            .timeout(Some(Duration::from_millis(100)))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ToolRunError::TimedOut { .. }));
    }

    #[test]
    fn test_program_lookup() {
        assert!(is_program_available("sh"));
        assert!(!is_program_available("shortclip-definitely-missing-tool"));
    }
}
