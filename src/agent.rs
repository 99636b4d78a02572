//! Agent command construction and prompt delivery.
//!
//! Each supported agent flavor differs in executable name, permission and
//! directory flags, default model, and in how the prompt reaches the
//! process: Claude Code reads it from stdin after launch, Copilot takes
//! it as a `--prompt` argument. Flavor behavior is data on [`AgentKind`]
//! rather than an inheritance hierarchy.
//!
//! An [`AgentBuilder`] is single-use: one builder per (cartridge, phase)
//! invocation, consumed by [`AgentBuilder::build_command`]. Reusing a
//! builder across phases would leak stale flags between invocations.

use crate::errors::AgentError;
use crate::session::LoggedChild;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::io::AsyncWriteExt;

/// Supported agent flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Claude Code CLI (`claude`). Prompt written to stdin.
    ClaudeCode,
    /// GitHub Copilot CLI (`copilot`). Prompt embedded as a `--prompt`
    /// argument.
    Copilot,
}

impl AgentKind {
    /// Resolve the CLI agent name. Unrecognized names are a usage error
    /// handled by the caller, not a parse failure.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "claude_code" => Some(AgentKind::ClaudeCode),
            "copilot" => Some(AgentKind::Copilot),
            _ => None,
        }
    }

    /// Default executable for this flavor, honoring the `CLAUDE_CMD` /
    /// `COPILOT_CMD` env overrides and the `.cmd` shim on Windows.
    pub fn default_program(self) -> String {
        let (env_key, base) = match self {
            AgentKind::ClaudeCode => ("CLAUDE_CMD", "claude"),
            AgentKind::Copilot => ("COPILOT_CMD", "copilot"),
        };
        if let Ok(cmd) = std::env::var(env_key) {
            if !cmd.is_empty() {
                return cmd;
            }
        }
        if cfg!(windows) {
            format!("{base}.cmd")
        } else {
            base.to_string()
        }
    }

    fn all_tools_flag(self) -> &'static str {
        match self {
            AgentKind::ClaudeCode => "--dangerously-skip-permissions",
            AgentKind::Copilot => "--allow-all-tools",
        }
    }

    fn default_model(self) -> Option<&'static str> {
        match self {
            // Claude Code picks its own model when none is given.
            AgentKind::ClaudeCode => None,
            AgentKind::Copilot => Some("gpt-4.1"),
        }
    }
}

/// How the prompt reaches the spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptDelivery {
    /// Prompt already embedded in the argument list; delivery is a no-op.
    Embedded,
    /// Prompt must be written to the child's stdin after launch.
    Stdin(String),
}

/// Single-use builder for one agent invocation.
#[derive(Debug)]
pub struct AgentBuilder {
    kind: AgentKind,
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    model: Option<String>,
    prompt: Option<String>,
}

impl AgentBuilder {
    pub fn new(kind: AgentKind, working_dir: PathBuf) -> Self {
        Self {
            kind,
            program: kind.default_program(),
            args: Vec::new(),
            working_dir,
            model: None,
            prompt: None,
        }
    }

    /// Replace the executable. Used by tests to point at stub scripts.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn set_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Grant the agent access to a directory. Appended immediately.
    pub fn set_directory(mut self, directory: &Path) -> Self {
        self.args.push("--add-dir".to_string());
        self.args.push(directory.to_string_lossy().into_owned());
        self
    }

    /// Grant full tool permissions. Appended immediately.
    pub fn allow_all_tools(mut self) -> Self {
        self.args.push(self.kind.all_tools_flag().to_string());
        self
    }

    pub fn set_prompt(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        match self.kind {
            AgentKind::ClaudeCode => self.prompt = Some(text),
            AgentKind::Copilot => {
                self.args.push("--prompt".to_string());
                self.args.push(text);
            }
        }
        self
    }

    /// Finalize the argument list. The model flag goes last so the
    /// flavor default (if any) can be resolved just before launch.
    pub fn build_command(mut self) -> AgentCommand {
        let model = self
            .model
            .or_else(|| self.kind.default_model().map(str::to_string));
        if let Some(model) = model {
            self.args.push("--model".to_string());
            self.args.push(model);
        }
        let delivery = match (self.kind, self.prompt) {
            (AgentKind::ClaudeCode, Some(text)) => PromptDelivery::Stdin(text),
            _ => PromptDelivery::Embedded,
        };
        AgentCommand {
            program: self.program,
            args: self.args,
            working_dir: self.working_dir,
            delivery,
        }
    }
}

/// A ready-to-start external command bound to a working directory.
#[derive(Debug)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub delivery: PromptDelivery,
}

impl AgentCommand {
    /// Whether the child needs a piped stdin for post-launch delivery.
    pub fn needs_stdin(&self) -> bool {
        matches!(self.delivery, PromptDelivery::Stdin(_))
    }

    /// Deliver the prompt to the started process. A no-op for embedded
    /// delivery. For stdin delivery, liveness is checked immediately
    /// before the write and again on write failure; an exited process
    /// surfaces as [`AgentError::ProcessExitedPrematurely`] carrying the
    /// exit code and whatever output landed in the phase log.
    pub async fn deliver_prompt(&self, logged: &mut LoggedChild) -> Result<(), AgentError> {
        let text = match &self.delivery {
            PromptDelivery::Embedded => return Ok(()),
            PromptDelivery::Stdin(text) => text,
        };

        if let Some(status) = logged.child.try_wait()? {
            return Err(premature_exit(status, logged.log_path()));
        }

        let mut stdin = logged
            .child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Io(std::io::Error::other("agent stdin was not piped")))?;

        let write_result: std::io::Result<()> = async {
            stdin.write_all(text.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
            stdin.shutdown().await
        }
        .await;

        if let Err(err) = write_result {
            if let Ok(Some(status)) = logged.child.try_wait() {
                return Err(premature_exit(status, logged.log_path()));
            }
            return Err(AgentError::Io(err));
        }
        Ok(())
    }
}

/// Build the premature-exit error, capturing the process output from the
/// phase log best-effort. Read failures during this diagnostic capture
/// are swallowed so they never mask the primary error.
fn premature_exit(status: ExitStatus, log_path: &Path) -> AgentError {
    let output = std::fs::read_to_string(log_path)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    AgentError::ProcessExitedPrematurely {
        exit_code: status.code().unwrap_or(-1),
        output,
    }
}
