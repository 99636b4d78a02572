//! Typed error hierarchy for the cartage orchestrator.
//!
//! Two top-level enums cover the two failure domains:
//! - `AgentError`: prompt delivery to a spawned agent process
//! - `RunError`: orchestration plumbing failures that abort the run
//!
//! A non-zero agent exit code is *not* an error here: it is recorded in
//! the logs and the run continues. Per-file rewrite failures are likewise
//! absorbed into `MigrationStats`. Everything that surfaces as `RunError`
//! from the migration loop is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Errors delivering a prompt to a running agent process.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent exited before (or while) the prompt was written to its
    /// stdin. Carries the exit code and whatever output the process
    /// managed to emit, read back best-effort from the phase log.
    #[error("process exited prematurely with code {exit_code}")]
    ProcessExitedPrematurely { exit_code: i32, output: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fatal failures in the orchestration loop. Any of these aborts the
/// whole run; remaining phases and cartridges are not attempted.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to write log header at {path}: {source}")]
    HeaderWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open phase log {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn agent process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("prompt delivery failed: {0}")]
    PromptDelivery(#[from] AgentError),

    #[error("failed waiting for agent process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("failed to load instructions for phase '{phase}': {source}")]
    Instructions {
        phase: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
