//! Integration tests for cartage
//!
//! These drive the compiled binary end to end: CLI validation, a full
//! workspace run against a stub agent, and the log artifacts it leaves
//! behind.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a cartage Command
fn cartage() -> Command {
    cargo_bin_cmd!("cartage")
}

/// Workspace with two cartridges, each holding a JUnit 5 test file.
fn create_workspace(dir: &TempDir) -> PathBuf {
    let ws = dir.path().join("workspace");
    for name in ["cart_a", "cart_b"] {
        let cart = ws.join(name);
        fs::create_dir_all(&cart).unwrap();
        fs::write(cart.join("build.gradle"), "").unwrap();
        fs::write(
            cart.join("Foo.java"),
            "package p;\n\nimport org.junit.jupiter.api.Test;\n\nclass Foo {\n    @BeforeEach\n    void setUp() {}\n}\n",
        )
        .unwrap();
    }
    ws
}

/// Three-phase workflow: agent, native, agent.
fn create_phases(dir: &TempDir) -> PathBuf {
    let phases = dir.path().join("phases");
    let instructions = phases.join("instructions");
    fs::create_dir_all(&instructions).unwrap();
    fs::write(
        phases.join("config.json"),
        r#"[
            {"name": "Analyze", "instructions": "analyze.md", "id": "analyze", "order": 1,
             "inputs": {"cartridge_path": "path"}},
            {"name": "Code migration", "instructions": "none.md", "id": "code_migration", "order": 2},
            {"name": "Verify", "instructions": "verify.md", "id": "verify", "order": 3,
             "inputs": {"cartridge_name": "name"}}
        ]"#,
    )
    .unwrap();
    fs::write(instructions.join("analyze.md"), "Analyze [CARTRIDGE_PATH]").unwrap();
    fs::write(instructions.join("verify.md"), "Verify [CARTRIDGE_NAME]").unwrap();
    phases
}

#[cfg(unix)]
fn write_stub(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("stub-agent.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_cartage_help() {
        cartage().arg("--help").assert().success();
    }

    #[test]
    fn test_cartage_version() {
        cartage().arg("--version").assert().success();
    }

    #[test]
    fn test_missing_required_flags_prints_usage_and_exits_1() {
        cartage()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Usage: cartage -p <path> -a <agent>"));
    }

    #[test]
    fn test_missing_agent_flag_prints_usage_and_exits_1() {
        let dir = TempDir::new().unwrap();
        cartage()
            .arg("-p")
            .arg(dir.path())
            .assert()
            .code(1)
            .stderr(predicate::str::contains("copilot or claude_code"));
    }

    #[test]
    fn test_unknown_agent_value_prints_usage_and_exits_1() {
        let dir = TempDir::new().unwrap();
        cartage()
            .arg("-p")
            .arg(dir.path())
            .arg("-a")
            .arg("bogus_agent")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Usage: cartage -p <path> -a <agent>"));
    }
}

#[cfg(unix)]
mod workspace_runs {
    use super::*;

    fn session_dir(logs_root: &Path) -> PathBuf {
        let mut entries: Vec<_> = fs::read_dir(logs_root)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        assert_eq!(entries.len(), 1, "expected a single session directory");
        entries.pop().unwrap()
    }

    #[test]
    fn test_full_workspace_run_produces_all_log_artifacts() {
        let dir = TempDir::new().unwrap();
        let ws = create_workspace(&dir);
        let phases = create_phases(&dir);
        let stub = write_stub(dir.path(), "cat > /dev/null");
        let logs = dir.path().join("logs");

        cartage()
            .env("CLAUDE_CMD", &stub)
            .arg("-p")
            .arg(&ws)
            .arg("-a")
            .arg("claude_code")
            .arg("--phases-dir")
            .arg(&phases)
            .arg("--logs-dir")
            .arg(&logs)
            .assert()
            .success()
            .stdout(predicate::str::contains("Workspace mode: Found 2 cartridges"))
            .stdout(predicate::str::contains("All logs saved to:"));

        let session = session_dir(&logs);
        let names: Vec<String> = fs::read_dir(&session)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names.iter().filter(|n| n.contains("_phase_")).count(),
            6,
            "phase logs: {names:?}"
        );
        assert_eq!(names.iter().filter(|n| n.ends_with("_summary.log")).count(), 2);
        assert!(names.contains(&"migration_master.log".to_string()));
        assert!(names.contains(&"SUMMARY.txt".to_string()));

        // Native phase rewrote the sources on the way through.
        let migrated = fs::read_to_string(ws.join("cart_b/Foo.java")).unwrap();
        assert!(migrated.contains("import org.junit.Test;"));
        assert!(migrated.contains("@Before\n"));

        let summary = fs::read_to_string(session.join("SUMMARY.txt")).unwrap();
        assert!(summary.contains("Total Cartridges: 2"));
        assert!(summary.contains("Total Phases: 3"));
    }

    #[test]
    fn test_failing_agent_still_completes_the_run() {
        let dir = TempDir::new().unwrap();
        let ws = create_workspace(&dir);
        let phases = create_phases(&dir);
        let stub = write_stub(dir.path(), "cat > /dev/null\nexit 9");
        let logs = dir.path().join("logs");

        cartage()
            .env("CLAUDE_CMD", &stub)
            .arg("-p")
            .arg(&ws)
            .arg("-a")
            .arg("claude_code")
            .arg("--phases-dir")
            .arg(&phases)
            .arg("--logs-dir")
            .arg(&logs)
            .assert()
            .success()
            .stderr(predicate::str::contains("Phase failed with exit code: 9"));

        let session = session_dir(&logs);
        let master = fs::read_to_string(session.join("migration_master.log")).unwrap();
        assert!(master.contains("Migration session completed"));
        assert!(session.join("SUMMARY.txt").exists());
    }

    #[test]
    fn test_single_cartridge_mode() {
        let dir = TempDir::new().unwrap();
        let ws = create_workspace(&dir);
        let phases = create_phases(&dir);
        let stub = write_stub(dir.path(), "cat > /dev/null");
        let logs = dir.path().join("logs");

        cartage()
            .env("CLAUDE_CMD", &stub)
            .arg("-p")
            .arg(ws.join("cart_a"))
            .arg("-a")
            .arg("claude_code")
            .arg("-s")
            .arg("--phases-dir")
            .arg(&phases)
            .arg("--logs-dir")
            .arg(&logs)
            .assert()
            .success()
            .stdout(predicate::str::contains("Single cartridge mode"));

        let session = session_dir(&logs);
        let names: Vec<String> = fs::read_dir(&session)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.iter().filter(|n| n.contains("_phase_")).count(), 3);
        assert_eq!(names.iter().filter(|n| n.ends_with("_summary.log")).count(), 1);
    }
}
