//! Cartridge model and discovery.
//!
//! A cartridge is one independently migratable source-code unit (a
//! directory subtree). Workspace mode scans the immediate children of a
//! root directory and selects those carrying a `build.gradle` marker;
//! single mode treats the given path itself as the one cartridge.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Build file whose presence marks a directory as a cartridge.
const CARTRIDGE_MARKER: &str = "build.gradle";

/// Phase marker assigned to a cartridge that has not been attempted yet.
pub const PHASE_TO_DO: &str = "to_do";

/// One migratable code unit. `current_phase` is a breadcrumb of the last
/// attempted phase id, advanced by the orchestrator after every phase
/// whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub name: String,
    pub path: PathBuf,
    pub current_phase: String,
}

impl Cartridge {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            path,
            current_phase: PHASE_TO_DO.to_string(),
        }
    }
}

/// Discovers the ordered cartridge list for a run.
pub struct CartridgeRepository {
    cartridges: Vec<Cartridge>,
}

impl CartridgeRepository {
    /// Scan `root` for cartridges. In single mode the root itself is the
    /// only cartridge; in workspace mode every immediate subdirectory
    /// containing a `build.gradle` is selected, sorted by name so runs
    /// are deterministic across filesystems.
    pub fn discover(root: &Path, single: bool) -> Result<Self> {
        let cartridges = if single {
            vec![Cartridge::new(root.to_path_buf())]
        } else {
            let mut found = Vec::new();
            let entries = std::fs::read_dir(root)
                .with_context(|| format!("failed to list workspace directory {}", root.display()))?;
            for entry in entries {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() && path.join(CARTRIDGE_MARKER).exists() {
                    found.push(Cartridge::new(path));
                }
            }
            found.sort_by(|a, b| a.name.cmp(&b.name));
            found
        };
        Ok(Self { cartridges })
    }

    pub fn cartridges(&self) -> &[Cartridge] {
        &self.cartridges
    }

    pub fn into_cartridges(self) -> Vec<Cartridge> {
        self.cartridges
    }

    pub fn len(&self) -> usize {
        self.cartridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cartridges.is_empty()
    }
}
