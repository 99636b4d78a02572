//! The migration control loop.
//!
//! Drives every cartridge through every phase in order. Native phases run
//! the local rewrite engine with its output appended to the phase log;
//! agent phases build a fresh agent command, substitute the instruction
//! template's input placeholders, spawn under log capture, deliver the
//! prompt, and wait for exit.
//!
//! Failure policy: a non-zero agent exit code is recorded and the run
//! moves on. Anything that breaks the orchestration plumbing itself
//! (header write, spawn, delivery, wait) is logged to all three tiers
//! and aborts the run.

use crate::agent::{AgentBuilder, AgentKind};
use crate::cartridge::{Cartridge, CartridgeRepository};
use crate::errors::RunError;
use crate::phase::{Phase, PhaseRepository};
use crate::rewrite::RewriteEngine;
use crate::rewrite::imports::{list_source_files, scan_imports};
use crate::session::{SessionLogger, spawn_logged};
use crate::ui::{ARROW, CHECK, CROSS, LOG_DIR, LOG_FILE, REPORT};
use anyhow::{Context, Result};
use console::style;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

/// Package prefixes left out of the `dependencies_list` prompt input.
const DEPENDENCY_EXCLUSIONS: &[&str] = &["com.intershop."];

/// Agent selection for a run. A fresh single-use builder is derived from
/// this for every (cartridge, phase) invocation.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub kind: AgentKind,
    pub model: Option<String>,
    /// Executable override, mainly for tests pointing at stub scripts.
    pub program: Option<String>,
}

impl AgentSpec {
    pub fn new(kind: AgentKind, model: Option<String>) -> Self {
        Self {
            kind,
            model,
            program: None,
        }
    }

    fn builder_for(&self, cartridge: &Cartridge) -> AgentBuilder {
        let mut builder = AgentBuilder::new(self.kind, cartridge.path.clone());
        if let Some(program) = &self.program {
            builder = builder.with_program(program.clone());
        }
        builder = builder
            .allow_all_tools()
            .set_directory(&cartridge.path);
        if let Some(model) = &self.model {
            builder = builder.set_model(model.clone());
        }
        builder
    }
}

/// One full migration run across all cartridges and phases.
pub struct Migrator {
    cartridges: Vec<Cartridge>,
    phase_repo: PhaseRepository,
    agent: AgentSpec,
    logger: SessionLogger,
}

impl Migrator {
    pub fn new(
        cartridge_repo: CartridgeRepository,
        phase_repo: PhaseRepository,
        agent: AgentSpec,
        logs_root: &Path,
    ) -> Result<Self> {
        let logger = SessionLogger::new(logs_root)?;
        Ok(Self {
            cartridges: cartridge_repo.into_cartridges(),
            phase_repo,
            agent,
            logger,
        })
    }

    pub fn session_dir(&self) -> &Path {
        self.logger.session_dir()
    }

    /// Run every phase against every cartridge, sequentially. Returns on
    /// the first fatal orchestration error; recorded phase failures do
    /// not stop the run.
    pub async fn migrate(mut self) -> Result<(), RunError> {
        let start = Instant::now();
        let phases = self
            .phase_repo
            .phases()
            .context("loading phase definitions")?;
        let mut cartridges = std::mem::take(&mut self.cartridges);

        self.logger.log_to_master("Migration session started");
        self.logger
            .log_to_master(&format!("Total cartridges: {}", cartridges.len()));
        self.logger
            .log_to_master(&format!("Total phases: {}", phases.len()));

        for cartridge in cartridges.iter_mut() {
            println!(
                "=== Migrating cartridge: {} ===",
                style(&cartridge.name).cyan().bold()
            );
            self.logger
                .log_to_master(&format!("Starting cartridge: {}", cartridge.name));
            self.logger.log_to_cartridge_summary(
                cartridge,
                &format!("Migration started for: {}", cartridge.name),
            );

            for phase in &phases {
                println!("  {ARROW} Phase {}: {}", phase.order, phase.name);
                self.logger
                    .log_to_master(&format!("  Phase {}: {}", phase.order, phase.name));
                self.logger.log_to_cartridge_summary(
                    cartridge,
                    &format!("Starting Phase {}: {}", phase.order, phase.name),
                );

                let log_path = self.logger.phase_log_path(cartridge, phase);
                if let Err(err) = self.run_phase(cartridge, phase, &log_path).await {
                    let msg = format!("Error executing phase: {err}");
                    eprintln!("    {CROSS} {msg}");
                    self.logger.log_to_phase_log(&log_path, &msg);
                    self.logger.log_to_master(&format!("  ✗ {msg}"));
                    self.logger.log_to_cartridge_summary(
                        cartridge,
                        &format!("✗ Phase {} error: {err}", phase.order),
                    );
                    return Err(err);
                }

                // Breadcrumb of the last attempted phase, success or not.
                cartridge.current_phase = phase.id.clone();
                println!("    {LOG_FILE}Log: {}", log_path.display());
            }

            println!("=== Completed migration for: {} ===\n", cartridge.name);
            self.logger
                .log_to_master(&format!("Completed cartridge: {}", cartridge.name));
            self.logger.log_to_cartridge_summary(
                cartridge,
                &format!("Migration completed for: {}", cartridge.name),
            );
        }

        self.logger.log_to_master("Migration session completed");
        let report = self
            .logger
            .create_summary_report(cartridges.len(), phases.len(), start.elapsed())
            .context("writing summary report")?;
        println!("\n{REPORT}Summary report created: {}", report.display());
        println!(
            "{LOG_DIR}All logs saved to: {}",
            self.logger.session_dir().display()
        );
        Ok(())
    }

    async fn run_phase(
        &self,
        cartridge: &Cartridge,
        phase: &Phase,
        log_path: &Path,
    ) -> Result<(), RunError> {
        self.logger
            .write_log_header(log_path, cartridge, phase)
            .map_err(|source| RunError::HeaderWrite {
                path: log_path.to_path_buf(),
                source,
            })?;

        if phase.is_native() {
            self.run_native_phase(cartridge, phase, log_path)
        } else {
            self.run_agent_phase(cartridge, phase, log_path).await
        }
    }

    /// Run the rewrite engine with its console output captured in the
    /// phase log, then append the statistics block.
    fn run_native_phase(
        &self,
        cartridge: &Cartridge,
        phase: &Phase,
        log_path: &Path,
    ) -> Result<(), RunError> {
        let mut sink = OpenOptions::new()
            .append(true)
            .create(true)
            .open(log_path)
            .with_context(|| format!("opening phase log {}", log_path.display()))?;

        let mut engine = RewriteEngine::new(cartridge.path.clone());
        let stats = engine.run(&mut sink);

        let _ = writeln!(
            sink,
            "\n=== Code Migration Statistics ===\nFiles processed: {}\nErrors: {}\n===================================\n",
            stats.files_processed, stats.error_count
        );

        let msg = format!("Native phase completed: {} files", stats.files_processed);
        println!("    {CHECK} {msg}");
        self.logger.log_to_master(&format!("  ✓ {msg}"));
        self.logger.log_to_cartridge_summary(
            cartridge,
            &format!("✓ Phase {} completed (native)", phase.order),
        );
        Ok(())
    }

    async fn run_agent_phase(
        &self,
        cartridge: &Cartridge,
        phase: &Phase,
        log_path: &Path,
    ) -> Result<(), RunError> {
        let template =
            self.phase_repo
                .instructions(phase)
                .map_err(|source| RunError::Instructions {
                    phase: phase.name.clone(),
                    source,
                })?;
        let prompt = prepare_prompt(&template, &phase.inputs, cartridge);

        let command = self
            .agent
            .builder_for(cartridge)
            .set_prompt(prompt)
            .build_command();

        let mut child = spawn_logged(&command, log_path)?;
        command.deliver_prompt(&mut child).await?;
        let status = child.wait().await.map_err(RunError::Wait)?;

        let exit_code = status.code().unwrap_or(-1);
        if exit_code == 0 {
            println!("    {CHECK} Phase completed successfully");
            self.logger
                .log_to_master("  ✓ Phase completed successfully");
            self.logger.log_to_cartridge_summary(
                cartridge,
                &format!("✓ Phase {} completed successfully", phase.order),
            );
        } else {
            let msg = format!("Phase failed with exit code: {exit_code}");
            eprintln!("    {CROSS} {msg}");
            self.logger.log_to_master(&format!("  ✗ {msg}"));
            self.logger.log_to_cartridge_summary(
                cartridge,
                &format!("✗ Phase {} failed with exit code: {exit_code}", phase.order),
            );
        }
        Ok(())
    }
}

/// Substitute every declared `[UPPERCASED_KEY]` input placeholder in the
/// instruction template. Unrecognized input names resolve to an empty
/// string rather than failing.
pub fn prepare_prompt(
    template: &str,
    inputs: &HashMap<String, String>,
    cartridge: &Cartridge,
) -> String {
    let mut result = template.to_string();
    for key in inputs.keys() {
        let placeholder = format!("[{}]", key.to_uppercase());
        result = result.replace(&placeholder, &input_value(key, cartridge));
    }
    result
}

fn input_value(key: &str, cartridge: &Cartridge) -> String {
    match key.to_lowercase().as_str() {
        "cartridge_path" => cartridge.path.display().to_string(),
        "cartridge_name" => cartridge.name.clone(),
        "dependencies_list" => scan_imports(&cartridge.path, DEPENDENCY_EXCLUSIONS).join("\n"),
        "file_list" => list_source_files(&cartridge.path).join("\n"),
        _ => String::new(),
    }
}
