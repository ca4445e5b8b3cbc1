//! Template-driven adapters for the transcription script and the render pipeline.
//!
//! Both tools are opaque commands; we only substitute `{input}`, `{output}` and
//! `{session}` into their arguments and export the same values as
//! `SHORTCLIP_INPUT`, `SHORTCLIP_OUTPUT` and `SHORTCLIP_SESSION`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::adapters::process::ToolCommand;
use crate::adapters::toml_config::CommandConfig;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// A configured external command
#[derive(Debug, Clone)]
pub struct CommandTool {
    name: &'static str,
    config: CommandConfig,
    timeout: Option<Duration>,
}

impl CommandTool {
    pub fn new(name: &'static str, config: CommandConfig, timeout: Option<Duration>) -> Self {
        Self {
            name,
            config,
            timeout,
        }
    }

    /// Substitute invocation values into the argument template
    pub fn expand_args(&self, invocation: &ToolInvocation) -> Vec<String> {
        let input = invocation.input.to_string_lossy();
        let output = invocation.output.to_string_lossy();
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{session}", invocation.session.as_str())
            })
            .collect()
    }

    fn command(&self, invocation: &ToolInvocation) -> ToolCommand {
        ToolCommand::new(&self.config.program)
            .args(self.expand_args(invocation))
            .working_dir(&self.config.working_dir)
            .env("SHORTCLIP_INPUT", invocation.input.to_string_lossy())
            .env("SHORTCLIP_OUTPUT", invocation.output.to_string_lossy())
            .env("SHORTCLIP_SESSION", invocation.session.as_str())
            .timeout(self.timeout)
    }

    /// Run the command; the error string is the diagnostic for the caller's error kind
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, String> {
        info!(
            tool = self.name,
            session = %invocation.session,
            program = %self.config.program,
            "Running {} step",
            self.name
        );

        let output = self
            .command(invocation)
            .run()
            .await
            .map_err(|e| e.to_string())?;

        if !output.stdout.trim().is_empty() {
            debug!(tool = self.name, stdout = %output.stdout.trim(), "Tool output");
        }
        if !output.success {
            warn!(
                tool = self.name,
                session = %invocation.session,
                exit_code = ?output.exit_code,
                stderr = %output.stderr_tail(10),
                "{} step failed",
                self.name
            );
            return Err(format!(
                "{} exited with {:?}: {}",
                self.config.program,
                output.exit_code,
                output.stderr_tail(5)
            ));
        }
        Ok(output)
    }
}

/// Transcription step backed by an external script
pub struct ScriptTranscriber(CommandTool);

impl ScriptTranscriber {
    pub fn new(config: CommandConfig, timeout: Option<Duration>) -> Self {
        Self(CommandTool::new("transcribe", config, timeout))
    }
}

#[async_trait]
impl TranscribePort for ScriptTranscriber {
    async fn transcribe(&self, invocation: &ToolInvocation) -> Result<ToolOutput, DomainError> {
        self.0
            .run(invocation)
            .await
            .map_err(DomainError::TranscriptionFailure)
    }
}

/// Render step backed by an external pipeline
pub struct PipelineRenderer(CommandTool);

impl PipelineRenderer {
    pub fn new(config: CommandConfig, timeout: Option<Duration>) -> Self {
        Self(CommandTool::new("render", config, timeout))
    }
}

#[async_trait]
impl RenderPort for PipelineRenderer {
    async fn render(&self, invocation: &ToolInvocation) -> Result<ToolOutput, DomainError> {
        if let Some(parent) = invocation.output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::io(parent.display(), e))?;
        }
        let output = self
            .0
            .run(invocation)
            .await
            .map_err(DomainError::RenderFailure)?;

        if !invocation.output.exists() {
            return Err(DomainError::RenderFailure(format!(
                "Render finished but {} was not produced",
                invocation.output.display()
            )));
        }
        Ok(output)
    }
}
