//! Session logging and logged process execution.
//!
//! Every run gets its own session directory under the logs root, named by
//! the start timestamp. Inside it live one log per (cartridge, phase), a
//! running summary per cartridge, one master log, and the final SUMMARY
//! report. All writes are append-only; tier messages carry a `[HH:MM:SS]`
//! stamp.
//!
//! `spawn_logged` starts an agent command with both output streams
//! durably redirected into the per-phase log file, and hands back the
//! live child for prompt delivery and waiting.

use crate::agent::AgentCommand;
use crate::cartridge::Cartridge;
use crate::errors::RunError;
use crate::phase::Phase;
use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::{Child, Command};

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

const RULE: &str = "================================================================================";

/// A spawned agent process whose output is captured in a phase log.
pub struct LoggedChild {
    pub child: Child,
    log_path: PathBuf,
}

impl LoggedChild {
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Block until the process exits. No timeout: a hung agent stalls
    /// the run.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }
}

/// Append-only log sink for one migration session.
pub struct SessionLogger {
    session_id: String,
    session_dir: PathBuf,
}

impl SessionLogger {
    /// Create the per-session directory under `logs_root`, named by the
    /// wall-clock start time.
    pub fn new(logs_root: &Path) -> Result<Self> {
        let session_id = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let session_dir = logs_root.join(format!("session_{session_id}"));
        std::fs::create_dir_all(&session_dir).with_context(|| {
            format!("failed to create session log directory {}", session_dir.display())
        })?;
        Ok(Self {
            session_id,
            session_dir,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Log file for one (cartridge, phase) pair.
    pub fn phase_log_path(&self, cartridge: &Cartridge, phase: &Phase) -> PathBuf {
        let name = sanitize_file_name(&cartridge.name);
        self.session_dir
            .join(format!("{}_phase_{}_{}.log", name, phase.order, phase.id))
    }

    /// Running summary log for one cartridge, all phases combined.
    pub fn cartridge_summary_path(&self, cartridge: &Cartridge) -> PathBuf {
        let name = sanitize_file_name(&cartridge.name);
        self.session_dir.join(format!("{name}_summary.log"))
    }

    /// The single master log for the whole session.
    pub fn master_log_path(&self) -> PathBuf {
        self.session_dir.join("migration_master.log")
    }

    /// Write the fixed-format header that opens every phase log.
    pub fn write_log_header(
        &self,
        log_path: &Path,
        cartridge: &Cartridge,
        phase: &Phase,
    ) -> std::io::Result<()> {
        let header = format!(
            "{RULE}\nMigration Log\n{RULE}\n\
             Cartridge: {}\nPath: {}\nPhase: {} - {}\nPhase ID: {}\nTimestamp: {}\n{RULE}\n\n",
            cartridge.name,
            cartridge.path.display(),
            phase.order,
            phase.name,
            phase.id,
            Local::now().format("%Y-%m-%dT%H:%M:%S"),
        );
        std::fs::write(log_path, header)
    }

    /// Append a timestamped line to the master log. Tier writes never
    /// abort the run; failures are reported through tracing.
    pub fn log_to_master(&self, message: &str) {
        append_stamped(&self.master_log_path(), message);
    }

    /// Append a timestamped line to a cartridge's summary log.
    pub fn log_to_cartridge_summary(&self, cartridge: &Cartridge, message: &str) {
        append_stamped(&self.cartridge_summary_path(cartridge), message);
    }

    /// Append a timestamped line to an arbitrary phase log. Used for
    /// fatal-error breadcrumbs when a phase dies mid-flight.
    pub fn log_to_phase_log(&self, log_path: &Path, message: &str) {
        append_stamped(log_path, message);
    }

    /// Write the end-of-run SUMMARY report and return its path.
    pub fn create_summary_report(
        &self,
        total_cartridges: usize,
        total_phases: usize,
        duration: Duration,
    ) -> Result<PathBuf> {
        let path = self.session_dir.join("SUMMARY.txt");
        let report = format!(
            "{RULE}\nMIGRATION SESSION SUMMARY\n{RULE}\n\
             Session ID: {}\nTotal Cartridges: {}\nTotal Phases: {}\n\
             Duration: {}\nCompleted: {}\n{RULE}\n\n\
             Detailed logs available in: {}\n",
            self.session_id,
            total_cartridges,
            total_phases,
            format_duration(duration),
            Local::now().format("%Y-%m-%dT%H:%M:%S"),
            self.session_dir.display(),
        );
        std::fs::write(&path, report)
            .with_context(|| format!("failed to write summary report {}", path.display()))?;
        Ok(path)
    }
}

/// Start an agent command with stdout and stderr appended to `log_path`.
/// The log file's parent directory is created if missing; stdin is piped
/// only when the command delivers its prompt post-launch.
pub fn spawn_logged(command: &AgentCommand, log_path: &Path) -> Result<LoggedChild, RunError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| RunError::LogOpen {
            path: log_path.to_path_buf(),
            source,
        })?;
    }

    let stdout = open_append(log_path).map_err(|source| RunError::LogOpen {
        path: log_path.to_path_buf(),
        source,
    })?;
    let stderr = stdout.try_clone().map_err(|source| RunError::LogOpen {
        path: log_path.to_path_buf(),
        source,
    })?;

    let child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(&command.working_dir)
        .stdin(if command.needs_stdin() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: command.program.clone(),
            source,
        })?;

    Ok(LoggedChild {
        child,
        log_path: log_path.to_path_buf(),
    })
}

/// Format a run duration as `N min M sec`, or `N sec` under a minute.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    if minutes > 0 {
        format!("{minutes} min {seconds} sec")
    } else {
        format!("{seconds} sec")
    }
}

fn sanitize_file_name(name: &str) -> String {
    UNSAFE_FILE_CHARS.replace_all(name, "_").into_owned()
}

fn append_stamped(path: &Path, message: &str) {
    let line = format!("[{}] {message}\n", Local::now().format("%H:%M:%S"));
    if let Err(err) = open_append(path).and_then(|mut f| f.write_all(line.as_bytes())) {
        tracing::warn!(path = %path.display(), %err, "failed to append log line");
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().append(true).create(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::PromptDelivery;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn cartridge(path: &Path) -> Cartridge {
        Cartridge::new(path.to_path_buf())
    }

    fn phase(order: u32, id: &str) -> Phase {
        Phase {
            name: format!("Phase {order}"),
            instructions: "none.md".into(),
            id: id.into(),
            order,
            inputs: HashMap::new(),
        }
    }

    fn shell_command(dir: &Path, script: &str, delivery: PromptDelivery) -> AgentCommand {
        AgentCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            working_dir: dir.to_path_buf(),
            delivery,
        }
    }

    #[test]
    fn phase_log_names_sanitize_cartridge_names() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path()).unwrap();
        let cart = Cartridge::new(PathBuf::from("/ws/app cartridge/v2"));
        let path = logger.phase_log_path(&cart, &phase(3, "tests"));
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "v2_phase_3_tests.log"
        );
    }

    #[test]
    fn header_contains_cartridge_and_phase_details() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path()).unwrap();
        let cart = cartridge(&dir.path().join("shop"));
        let ph = phase(2, "code_migration");
        let log = logger.phase_log_path(&cart, &ph);
        logger.write_log_header(&log, &cart, &ph).unwrap();

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.starts_with(RULE));
        assert!(content.contains("Migration Log"));
        assert!(content.contains("Cartridge: shop"));
        assert!(content.contains("Phase: 2 - Phase 2"));
        assert!(content.contains("Phase ID: code_migration"));
        assert!(content.ends_with("\n\n"));
    }

    #[test]
    fn tier_lines_are_timestamped_and_appended() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path()).unwrap();
        logger.log_to_master("first");
        logger.log_to_master("second");
        let content = std::fs::read_to_string(logger.master_log_path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
    }

    #[test]
    fn format_duration_switches_at_one_minute() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42 sec");
        assert_eq!(format_duration(Duration::from_secs(60)), "1 min 0 sec");
        assert_eq!(format_duration(Duration::from_secs(150)), "2 min 30 sec");
    }

    #[test]
    fn summary_report_has_banner_and_counts() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path()).unwrap();
        let path = logger
            .create_summary_report(2, 5, Duration::from_secs(90))
            .unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("MIGRATION SESSION SUMMARY"));
        assert!(content.contains("Total Cartridges: 2"));
        assert!(content.contains("Total Phases: 5"));
        assert!(content.contains("Duration: 1 min 30 sec"));
    }

    #[tokio::test]
    async fn spawn_logged_appends_both_streams_after_header() {
        let dir = tempdir().unwrap();
        let logger = SessionLogger::new(dir.path()).unwrap();
        let cart = cartridge(dir.path());
        let ph = phase(1, "analyze");
        let log = logger.phase_log_path(&cart, &ph);
        logger.write_log_header(&log, &cart, &ph).unwrap();

        let cmd = shell_command(
            dir.path(),
            "echo to-stdout; echo to-stderr 1>&2",
            PromptDelivery::Embedded,
        );
        let mut child = spawn_logged(&cmd, &log).unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.starts_with(RULE), "header must survive the spawn");
        assert!(content.contains("to-stdout"));
        assert!(content.contains("to-stderr"));
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("phase.log");
        let cmd = AgentCommand {
            program: "definitely-not-a-real-agent".into(),
            args: vec![],
            working_dir: dir.path().to_path_buf(),
            delivery: PromptDelivery::Embedded,
        };
        let err = spawn_logged(&cmd, &log).err().expect("spawn must fail");
        match err {
            RunError::Spawn { program, .. } => {
                assert_eq!(program, "definitely-not-a-real-agent");
            }
            other => panic!("expected Spawn error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unopenable_log_path_is_a_log_open_error() {
        let dir = tempdir().unwrap();
        // A regular file where the log's parent directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let log = blocker.join("phase.log");

        let cmd = shell_command(dir.path(), "true", PromptDelivery::Embedded);
        let err = spawn_logged(&cmd, &log).err().expect("open must fail");
        match err {
            RunError::LogOpen { path, .. } => assert_eq!(path, log),
            other => panic!("expected LogOpen error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn prompt_delivery_to_exited_process_reports_exit_code() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("phase.log");
        let cmd = shell_command(dir.path(), "exit 7", PromptDelivery::Stdin("hello".into()));
        let mut child = spawn_logged(&cmd, &log).unwrap();

        // Give the child time to exit before delivery is attempted.
        tokio::time::sleep(Duration::from_millis(200)).await;

        match cmd.deliver_prompt(&mut child).await {
            Err(crate::errors::AgentError::ProcessExitedPrematurely { exit_code, .. }) => {
                assert_eq!(exit_code, 7);
            }
            other => panic!("expected ProcessExitedPrematurely, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn prompt_delivery_feeds_stdin_of_live_process() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("phase.log");
        let cmd = shell_command(dir.path(), "cat", PromptDelivery::Stdin("echoed back".into()));
        let mut child = spawn_logged(&cmd, &log).unwrap();

        cmd.deliver_prompt(&mut child).await.unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("echoed back"));
    }
}
