//! Phase definitions and JSON loading.
//!
//! Phases come from a JSON configuration file (an array of phase records)
//! paired with a directory of instruction templates. Phases are sorted
//! ascending by `order`; the sort is stable, so records sharing an
//! `order` value execute in load order and duplicates are preserved.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Reserved phase id executed by the local rewrite engine instead of an
/// external agent.
pub const NATIVE_PHASE_ID: &str = "code_migration";

/// One ordered step of the migration workflow. Immutable after load.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Phase {
    /// Human-readable display name.
    pub name: String,
    /// File name of the instruction template, relative to the
    /// instructions directory.
    pub instructions: String,
    /// Stable id; `code_migration` selects native execution.
    pub id: String,
    /// 1-based execution order.
    pub order: u32,
    /// Named input slots substituted into the instruction template as
    /// `[UPPERCASED_KEY]` placeholders.
    #[serde(default)]
    pub inputs: HashMap<String, String>,
}

impl Phase {
    pub fn is_native(&self) -> bool {
        self.id == NATIVE_PHASE_ID
    }
}

/// Loads phase definitions and their instruction templates.
pub struct PhaseRepository {
    config_path: PathBuf,
    instructions_dir: PathBuf,
}

impl PhaseRepository {
    pub fn new(config_path: PathBuf, instructions_dir: PathBuf) -> Self {
        Self {
            config_path,
            instructions_dir,
        }
    }

    /// Parse the configuration file and return phases sorted ascending
    /// by `order`.
    pub fn phases(&self) -> Result<Vec<Phase>> {
        let content = std::fs::read_to_string(&self.config_path).with_context(|| {
            format!(
                "failed to read phase configuration: {}",
                self.config_path.display()
            )
        })?;
        let mut phases: Vec<Phase> = serde_json::from_str(&content).with_context(|| {
            format!(
                "failed to parse phase configuration: {}",
                self.config_path.display()
            )
        })?;
        // Stable sort: equal orders keep their position in the file.
        phases.sort_by_key(|p| p.order);
        Ok(phases)
    }

    /// Read the raw instruction template referenced by a phase.
    pub fn instructions(&self, phase: &Phase) -> Result<String> {
        let path = self.instructions_dir.join(&phase.instructions);
        std::fs::read_to_string(&path).with_context(|| {
            format!(
                "failed to read instructions for phase '{}': {}",
                phase.name,
                path.display()
            )
        })
    }
}
